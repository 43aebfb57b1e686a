use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use colored::Colorize;
use experiment::{PathConvention, RunConfiguration, RunOptions, StageKind, ToolSettings};
use pipeline::StagePipeline;
use report::RunSummary;
use runner::{DryRunExecutor, PipelineOrchestrator, ProcessExecutor, StdinPrompt};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use tracing::{info, warn};

/// stack-cv - 5-fold stacked cross-validation driver
#[derive(Parser)]
#[command(name = "stack-cv")]
#[command(
    about = "Runs level-1 recommenders and a linear-regression meta-learner over 5 folds",
    long_about = None
)]
struct Cli {
    /// Comma-separated level-1 algorithms (default: the full catalog)
    #[arg(short = 'a', value_name = "LIST")]
    algorithms: Option<String>,

    /// Ratings dataset
    #[arg(short = 'i', value_name = "DATASET")]
    input: Option<PathBuf>,

    /// Output folder
    #[arg(short = 'o', value_name = "DIR")]
    output: Option<PathBuf>,

    /// Item attributes file
    #[arg(short = 't', value_name = "FILE")]
    item_attributes: Option<PathBuf>,

    /// User attributes file
    #[arg(short = 'u', value_name = "FILE")]
    user_attributes: Option<PathBuf>,

    /// Path to weka.jar
    #[arg(short = 'w', value_name = "JAR")]
    weka: Option<PathBuf>,

    /// Directory holding generate_cv.py, level1_predictors.py and generate_weka.py
    #[arg(long, default_value = ".")]
    tools_dir: PathBuf,

    /// JVM launcher for the meta-learner
    #[arg(long, default_value = "java")]
    java: PathBuf,

    /// Maximum JVM heap for the meta-learner
    #[arg(long, default_value = "2000m")]
    java_heap: String,

    /// Where the per-fold meta-learner reports are written
    #[arg(long, default_value = ".")]
    report_dir: PathBuf,

    /// Number of folds of the same stage to run at once
    #[arg(long, default_value = "1")]
    jobs: usize,

    /// Skip commands whose outputs are already present
    #[arg(long)]
    resume: bool,

    /// Ask before starting the meta-learner stage
    #[arg(long)]
    confirm: bool,

    /// Print the commands instead of running them
    #[arg(long)]
    dry_run: bool,
}

impl Cli {
    fn run_options(&self) -> RunOptions {
        RunOptions {
            algorithms: self.algorithms.clone(),
            dataset: self.input.clone(),
            output: self.output.clone(),
            item_attributes: self.item_attributes.clone(),
            user_attributes: self.user_attributes.clone(),
            meta_learner: self.weka.clone(),
            report_dir: Some(self.report_dir.clone()),
            tools: ToolSettings {
                tools_dir: self.tools_dir.clone(),
                java: self.java.clone(),
                java_heap: self.java_heap.clone(),
            },
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    // Usage errors exit with 2, like the argument parser's own
    let config = match RunConfiguration::resolve(cli.run_options()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{} {}\n", "error:".red().bold(), err);
            eprintln!("{}", Cli::command().render_help());
            return ExitCode::from(2);
        }
    };

    let result = if cli.dry_run {
        handle_dry_run(config, cli.resume).await
    } else {
        handle_run(config, &cli).await
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {:#}", "error:".red().bold(), err);
            ExitCode::FAILURE
        }
    }
}

/// Print every command in stage order without running anything
async fn handle_dry_run(config: RunConfiguration, resume: bool) -> Result<()> {
    let orchestrator = PipelineOrchestrator::new(config, StagePipeline::stacking(), DryRunExecutor)
        .with_resume(resume);
    orchestrator.run().await?;
    Ok(())
}

/// Run the whole pipeline, then summarize the meta-learner reports
async fn handle_run(config: RunConfiguration, cli: &Cli) -> Result<()> {
    let mut orchestrator = PipelineOrchestrator::new(config, StagePipeline::stacking(), ProcessExecutor)
        .with_jobs(cli.jobs)
        .with_resume(cli.resume);
    if cli.confirm {
        orchestrator = orchestrator.with_gate(StageKind::MetaLearner, StdinPrompt);
    }

    info!(
        "Starting stacked cross-validation into {}",
        orchestrator.config().output_root().display()
    );
    let start = Instant::now();
    let outcome = orchestrator.run().await.context("Stacking pipeline failed")?;
    info!("Stacked cross-validation finished in {:.2?}", start.elapsed());
    println!(
        "{} Ran {} command(s), skipped {} in {:.2?}",
        "✓".green(),
        outcome.executed,
        outcome.skipped,
        start.elapsed()
    );

    // Every stage succeeded; a report we cannot read is not a failed run
    let paths = orchestrator.config().paths().clone();
    let summary_path = paths.summary();
    let summary = tokio::task::spawn_blocking(move || summarize_reports(&paths))
        .await
        .context("Report summarizer panicked")?;

    if let Some(summary) = summary {
        print_summary(&summary);
        println!("Summary written to {}", summary_path.display());
    }
    Ok(())
}

/// Summarize the meta-learner reports into `summary.json`.
///
/// Returns `None` (after a warning) when the reports cannot be summarized.
fn summarize_reports(paths: &PathConvention) -> Option<RunSummary> {
    let summary_path = paths.summary();
    let result = report::summarize(paths)
        .context("Failed to summarize meta-learner reports")
        .and_then(|summary| {
            report::write_summary(&summary, &summary_path)
                .with_context(|| format!("Failed to write {}", summary_path.display()))?;
            Ok(summary)
        });

    match result {
        Ok(summary) => Some(summary),
        Err(err) => {
            warn!("No run summary: {:#}", err);
            None
        }
    }
}

/// Helper function to print the per-fold metrics table
fn print_summary(summary: &RunSummary) {
    println!("{}", "Meta-learner results:".bold().blue());
    println!("{:>6} {:>9} {:>9} {:>9}", "fold", "scored", "MAE", "RMSE");
    for fold in &summary.folds {
        println!(
            "{} {:>9} {:>9.4} {:>9.4}",
            format!("{:>6}", fold.fold).green(),
            fold.metrics.count,
            fold.metrics.mae,
            fold.metrics.rmse
        );
        if fold.unscored > 0 {
            println!("       {} {} row(s) without a rating", "•".yellow(), fold.unscored);
        }
    }
    println!(
        "{} {:>9} {:>9.4} {:>9.4}",
        format!("{:>6}", "pooled").cyan(),
        summary.pooled.count,
        summary.pooled.mae,
        summary.pooled.rmse
    );
    println!(
        "{}Mean fold RMSE: {:.4}, mean fold MAE: {:.4}",
        "• ".cyan(),
        summary.mean_rmse,
        summary.mean_mae
    );
}
