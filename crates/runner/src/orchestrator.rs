//! # Pipeline Orchestrator
//!
//! This module drives a stacked cross-validation run:
//! 1. Split the dataset into folds
//! 2. Run the level-1 predictors on every fold
//! 3. Generate meta-features for every fold
//! 4. Run the meta-learner on every fold
//!
//! Each stage finishes for all folds before the next one starts. Within a
//! stage, folds run one at a time by default, or up to `jobs` at once on
//! tokio's blocking pool. The first failure stops the run: nothing new is
//! started, already-running folds are awaited, and that failure is returned
//! as-is.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use anyhow::{Context, Result};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info};

use experiment::{FOLD_COUNT, RunConfiguration, StageKind};
use pipeline::{Stage, StageInvocation, StagePipeline, ensure_disjoint_outputs};

use crate::error::RunError;
use crate::executor::Executor;
use crate::gate::Gate;

/// How many invocations ran and how many were skipped as already complete
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOutcome {
    pub executed: usize,
    pub skipped: usize,
}

impl RunOutcome {
    fn absorb(&mut self, other: RunOutcome) {
        self.executed += other.executed;
        self.skipped += other.skipped;
    }
}

type StageGate = (StageKind, Arc<dyn Gate>);

/// Main orchestrator that sequences the stages of a run
pub struct PipelineOrchestrator<E> {
    config: RunConfiguration,
    pipeline: StagePipeline,
    executor: Arc<E>,
    gate: Option<StageGate>,
    jobs: usize,
    resume: bool,
}

impl<E: Executor> PipelineOrchestrator<E> {
    /// Create an orchestrator that runs folds one at a time and never skips
    pub fn new(config: RunConfiguration, pipeline: StagePipeline, executor: E) -> Self {
        Self {
            config,
            pipeline,
            executor: Arc::new(executor),
            gate: None,
            jobs: 1,
            resume: false,
        }
    }

    /// Run up to `jobs` folds of the same stage at once (1..=FOLD_COUNT)
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.clamp(1, usize::from(FOLD_COUNT));
        self
    }

    /// Skip invocations that finished successfully before and whose outputs
    /// are still present and non-empty
    pub fn with_resume(mut self, resume: bool) -> Self {
        self.resume = resume;
        self
    }

    /// Ask `gate` once before the first invocation of `stage` runs
    pub fn with_gate(mut self, stage: StageKind, gate: impl Gate + 'static) -> Self {
        self.gate = Some((stage, Arc::new(gate)));
        self
    }

    pub fn config(&self) -> &RunConfiguration {
        &self.config
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Main entry point: run every stage in order
    pub async fn run(&self) -> Result<RunOutcome> {
        let start_time = Instant::now();
        let mut outcome = RunOutcome::default();
        let mut gate = self.gate.clone();

        for stage in self.pipeline.stages() {
            let stage_start = Instant::now();
            info!("Starting stage {}", stage.name());

            let stage_outcome = if self.jobs > 1 && stage.targets().len() > 1 {
                self.run_stage_concurrently(stage.as_ref(), &mut gate).await?
            } else {
                self.run_stage_sequentially(stage.as_ref(), &mut gate).await?
            };

            info!(
                "Stage {} finished in {:.2?} ({} run, {} skipped)",
                stage.name(),
                stage_start.elapsed(),
                stage_outcome.executed,
                stage_outcome.skipped
            );
            outcome.absorb(stage_outcome);
        }

        info!(
            "Pipeline finished in {:.2?} ({} run, {} skipped)",
            start_time.elapsed(),
            outcome.executed,
            outcome.skipped
        );
        Ok(outcome)
    }

    /// Build and run each target in order; a fold's invocation (and its
    /// output directory) only comes into existence right before it runs
    async fn run_stage_sequentially(
        &self,
        stage: &dyn Stage,
        gate: &mut Option<StageGate>,
    ) -> Result<RunOutcome> {
        let mut outcome = RunOutcome::default();

        for target in stage.targets() {
            let invocation = stage.build(&self.config, target)?;
            if self.should_skip(&invocation) {
                outcome.skipped += 1;
                continue;
            }
            pass_gate(stage.kind(), gate).await?;
            self.execute(invocation).await?;
            outcome.executed += 1;
        }

        Ok(outcome)
    }

    /// Build every target up front, then run them on the blocking pool
    async fn run_stage_concurrently(
        &self,
        stage: &dyn Stage,
        gate: &mut Option<StageGate>,
    ) -> Result<RunOutcome> {
        let mut outcome = RunOutcome::default();
        let mut pending = Vec::new();

        for target in stage.targets() {
            let invocation = stage.build(&self.config, target)?;
            if self.should_skip(&invocation) {
                outcome.skipped += 1;
            } else {
                pending.push(invocation);
            }
        }
        if pending.is_empty() {
            return Ok(outcome);
        }

        ensure_disjoint_outputs(&pending)?;
        pass_gate(stage.kind(), gate).await?;

        let permits = Arc::new(Semaphore::new(self.jobs));
        let failed = Arc::new(AtomicBool::new(false));
        let mut tasks = JoinSet::new();
        for invocation in pending {
            tasks.spawn(run_permitted(
                Arc::clone(&self.executor),
                invocation,
                Arc::clone(&permits),
                Arc::clone(&failed),
            ));
        }

        let mut first_error = None;
        while let Some(joined) = tasks.join_next().await {
            match joined.context("Fold task panicked").and_then(|result| result) {
                Ok(true) => outcome.executed += 1,
                Ok(false) => {}
                Err(err) => {
                    first_error.get_or_insert(err);
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(outcome),
        }
    }

    fn should_skip(&self, invocation: &StageInvocation) -> bool {
        if self.resume && invocation.outputs_complete() {
            info!(
                "Skipping {} for {}: already completed",
                invocation.stage(),
                invocation.target()
            );
            return true;
        }
        false
    }

    async fn execute(&self, invocation: StageInvocation) -> Result<()> {
        let executor = Arc::clone(&self.executor);
        tokio::task::spawn_blocking(move || executor.execute(&invocation))
            .await
            .context("Stage task panicked")??;
        Ok(())
    }
}

/// Wait for a permit, then run unless another fold has already failed.
///
/// Returns whether the invocation actually ran.
async fn run_permitted<E: Executor>(
    executor: Arc<E>,
    invocation: StageInvocation,
    permits: Arc<Semaphore>,
    failed: Arc<AtomicBool>,
) -> Result<bool> {
    let _permit = permits.acquire_owned().await?;
    if failed.load(Ordering::SeqCst) {
        debug!(
            "Not starting {} for {} after an earlier failure",
            invocation.stage(),
            invocation.target()
        );
        return Ok(false);
    }

    let result = tokio::task::spawn_blocking(move || executor.execute(&invocation))
        .await
        .context("Stage task panicked")?;
    if result.is_err() {
        failed.store(true, Ordering::SeqCst);
    }
    result?;
    Ok(true)
}

/// Consult the gate if it guards `stage`; it is consumed on first use
async fn pass_gate(stage: StageKind, gate: &mut Option<StageGate>) -> Result<()> {
    let guard = match gate.take() {
        Some((gated, guard)) if gated == stage => guard,
        other => {
            *gate = other;
            return Ok(());
        }
    };

    info!("Waiting for confirmation before the {} stage", stage);
    let approved = tokio::task::spawn_blocking(move || guard.confirm(stage))
        .await
        .context("Confirmation gate panicked")??;
    if !approved {
        return Err(RunError::Declined { stage }.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use experiment::{RunOptions, Target};
    use pipeline::StageError;
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    // ============================================================================
    // Test Fixtures
    // ============================================================================

    type CallLog = Arc<Mutex<Vec<(StageKind, Target)>>>;

    /// Records calls; optionally fails one target and/or fakes the outputs
    #[derive(Default)]
    struct RecordingExecutor {
        calls: CallLog,
        fail_on: Option<(StageKind, Target)>,
        produce_outputs: bool,
    }

    impl RecordingExecutor {
        fn calls(&self) -> Vec<(StageKind, Target)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Executor for RecordingExecutor {
        fn execute(&self, invocation: &StageInvocation) -> pipeline::Result<()> {
            let call = (invocation.stage(), invocation.target());
            self.calls.lock().unwrap().push(call);
            invocation.clear_completion()?;

            // A failing call still leaves whatever it wrote so far
            if self.produce_outputs {
                for output in invocation.outputs() {
                    if invocation.stage() == StageKind::Level1 {
                        fs::create_dir_all(output).unwrap();
                        fs::write(output.join("UserKNN.pred"), "1 1 4.0").unwrap();
                    } else {
                        fs::write(output, "done").unwrap();
                    }
                }
            }
            if self.fail_on == Some(call) {
                return Err(StageError::MissingArtifact {
                    stage: call.0,
                    target: call.1,
                    path: PathBuf::from("simulated"),
                });
            }
            if self.produce_outputs {
                invocation.mark_complete()?;
            }
            Ok(())
        }
    }

    /// Gate that records how many stage calls had happened when it was asked
    struct CountingGate {
        calls: CallLog,
        asked_at: Arc<Mutex<Vec<usize>>>,
        answer: bool,
    }

    impl Gate for CountingGate {
        fn confirm(&self, _stage: StageKind) -> Result<bool> {
            let seen = self.calls.lock().unwrap().len();
            self.asked_at.lock().unwrap().push(seen);
            Ok(self.answer)
        }
    }

    fn build_config(root: &Path) -> RunConfiguration {
        RunConfiguration::resolve(RunOptions {
            algorithms: Some("UserKNN,ItemKNN".to_string()),
            dataset: Some(root.join("ratings.dat")),
            output: Some(root.join("out")),
            meta_learner: Some(root.join("weka.jar")),
            report_dir: Some(root.join("reports")),
            ..Default::default()
        })
        .unwrap()
    }

    fn fold(i: u8) -> Target {
        Target::Fold(experiment::FoldIndex::new(i).unwrap())
    }

    fn position(calls: &[(StageKind, Target)], stage: StageKind) -> Vec<usize> {
        calls
            .iter()
            .enumerate()
            .filter(|(_, (s, _))| *s == stage)
            .map(|(i, _)| i)
            .collect()
    }

    // ============================================================================
    // Tests
    // ============================================================================

    #[tokio::test]
    async fn test_runs_every_stage_in_order() {
        let scratch = tempfile::tempdir().unwrap();
        let orchestrator = PipelineOrchestrator::new(
            build_config(scratch.path()),
            StagePipeline::stacking(),
            RecordingExecutor::default(),
        );

        let outcome = orchestrator.run().await.unwrap();
        let calls = orchestrator.executor().calls();

        assert_eq!(outcome, RunOutcome { executed: 16, skipped: 0 });
        assert_eq!(calls[0], (StageKind::FoldSplit, Target::Dataset));
        let expected: Vec<Target> = (1..=5).map(fold).collect();
        for stage in [StageKind::Level1, StageKind::MetaFeatures, StageKind::MetaLearner] {
            let targets: Vec<Target> = calls
                .iter()
                .filter(|(s, _)| *s == stage)
                .map(|(_, t)| *t)
                .collect();
            assert_eq!(targets, expected);
        }
    }

    #[tokio::test]
    async fn test_dry_run_executes_nothing() {
        let scratch = tempfile::tempdir().unwrap();
        let orchestrator = PipelineOrchestrator::new(
            build_config(scratch.path()),
            StagePipeline::stacking(),
            crate::executor::DryRunExecutor,
        );

        let outcome = orchestrator.run().await.unwrap();

        assert_eq!(outcome.executed, 16);
        assert!(!scratch.path().join("out").join("lvl1cv").join("r1_train").exists());
        assert!(!scratch.path().join("reports").join("streamout1.txt").exists());
    }

    #[tokio::test]
    async fn test_failure_stops_the_pipeline() {
        let scratch = tempfile::tempdir().unwrap();
        let orchestrator = PipelineOrchestrator::new(
            build_config(scratch.path()),
            StagePipeline::stacking(),
            RecordingExecutor {
                fail_on: Some((StageKind::Level1, fold(2))),
                ..Default::default()
            },
        );

        let err = orchestrator.run().await.unwrap_err();
        let calls = orchestrator.executor().calls();

        assert!(matches!(
            err.downcast_ref::<StageError>(),
            Some(StageError::MissingArtifact { .. })
        ));
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[2], (StageKind::Level1, fold(2)));
        // Fold 3's directory was never built
        assert!(!scratch.path().join("out").join("lvl1out").join("r3").exists());
    }

    #[tokio::test]
    async fn test_resume_skips_completed_invocations() {
        let scratch = tempfile::tempdir().unwrap();
        let first = PipelineOrchestrator::new(
            build_config(scratch.path()),
            StagePipeline::stacking(),
            RecordingExecutor {
                produce_outputs: true,
                ..Default::default()
            },
        );
        first.run().await.unwrap();

        fs::remove_file(scratch.path().join("reports").join("streamout3.txt")).unwrap();

        let second = PipelineOrchestrator::new(
            build_config(scratch.path()),
            StagePipeline::stacking(),
            RecordingExecutor::default(),
        )
        .with_resume(true);
        let outcome = second.run().await.unwrap();

        assert_eq!(outcome, RunOutcome { executed: 1, skipped: 15 });
        assert_eq!(second.executor().calls(), vec![(StageKind::MetaLearner, fold(3))]);
    }

    #[tokio::test]
    async fn test_resume_reruns_a_failed_fold() {
        let scratch = tempfile::tempdir().unwrap();
        let failing = PipelineOrchestrator::new(
            build_config(scratch.path()),
            StagePipeline::stacking(),
            RecordingExecutor {
                fail_on: Some((StageKind::MetaLearner, fold(2))),
                produce_outputs: true,
                ..Default::default()
            },
        );
        assert!(failing.run().await.is_err());
        // The failed fold left a non-empty report behind
        assert!(scratch.path().join("reports").join("streamout2.txt").is_file());

        let resumed = PipelineOrchestrator::new(
            build_config(scratch.path()),
            StagePipeline::stacking(),
            RecordingExecutor {
                produce_outputs: true,
                ..Default::default()
            },
        )
        .with_resume(true);
        let outcome = resumed.run().await.unwrap();

        assert_eq!(outcome, RunOutcome { executed: 4, skipped: 12 });
        let expected: Vec<(StageKind, Target)> =
            (2..=5).map(|i| (StageKind::MetaLearner, fold(i))).collect();
        assert_eq!(resumed.executor().calls(), expected);
    }

    #[tokio::test]
    async fn test_jobs_are_clamped_to_fold_count() {
        let scratch = tempfile::tempdir().unwrap();
        let config = build_config(scratch.path());

        let none = PipelineOrchestrator::new(config.clone(), StagePipeline::stacking(), RecordingExecutor::default())
            .with_jobs(0);
        assert_eq!(none.jobs, 1);

        let huge = PipelineOrchestrator::new(config, StagePipeline::stacking(), RecordingExecutor::default())
            .with_jobs(usize::MAX);
        assert_eq!(huge.jobs, usize::from(FOLD_COUNT));

        let outcome = huge.run().await.unwrap();
        assert_eq!(outcome.executed, 16);
    }

    #[tokio::test]
    async fn test_without_resume_everything_reruns() {
        let scratch = tempfile::tempdir().unwrap();
        let executor = RecordingExecutor {
            produce_outputs: true,
            ..Default::default()
        };
        let orchestrator =
            PipelineOrchestrator::new(build_config(scratch.path()), StagePipeline::stacking(), executor);

        orchestrator.run().await.unwrap();
        let outcome = orchestrator.run().await.unwrap();

        assert_eq!(outcome.executed, 16);
        assert_eq!(orchestrator.executor().calls().len(), 32);
    }

    #[tokio::test]
    async fn test_gate_fires_once_before_meta_learner() {
        let scratch = tempfile::tempdir().unwrap();
        let executor = RecordingExecutor::default();
        let asked_at = Arc::new(Mutex::new(Vec::new()));
        let gate = CountingGate {
            calls: Arc::clone(&executor.calls),
            asked_at: Arc::clone(&asked_at),
            answer: true,
        };

        let orchestrator =
            PipelineOrchestrator::new(build_config(scratch.path()), StagePipeline::stacking(), executor)
                .with_gate(StageKind::MetaLearner, gate);
        orchestrator.run().await.unwrap();

        // fold split + 5 level-1 + 5 meta-feature calls precede it
        assert_eq!(*asked_at.lock().unwrap(), vec![11]);
    }

    #[tokio::test]
    async fn test_declined_gate_stops_before_meta_learner() {
        let scratch = tempfile::tempdir().unwrap();
        let executor = RecordingExecutor::default();
        let gate = CountingGate {
            calls: Arc::clone(&executor.calls),
            asked_at: Arc::new(Mutex::new(Vec::new())),
            answer: false,
        };

        let orchestrator =
            PipelineOrchestrator::new(build_config(scratch.path()), StagePipeline::stacking(), executor)
                .with_gate(StageKind::MetaLearner, gate);
        let err = orchestrator.run().await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<RunError>(),
            Some(RunError::Declined { stage: StageKind::MetaLearner })
        ));
        let calls = orchestrator.executor().calls();
        assert!(position(&calls, StageKind::MetaLearner).is_empty());
        assert_eq!(calls.len(), 11);
    }

    #[tokio::test]
    async fn test_concurrent_folds_keep_stage_barrier() {
        let scratch = tempfile::tempdir().unwrap();
        let orchestrator = PipelineOrchestrator::new(
            build_config(scratch.path()),
            StagePipeline::stacking(),
            RecordingExecutor::default(),
        )
        .with_jobs(3);

        let outcome = orchestrator.run().await.unwrap();
        let calls = orchestrator.executor().calls();

        assert_eq!(outcome.executed, 16);
        let level1 = position(&calls, StageKind::Level1);
        let meta = position(&calls, StageKind::MetaFeatures);
        let learner = position(&calls, StageKind::MetaLearner);
        assert_eq!(level1.len(), 5);
        assert!(level1.iter().max() < meta.iter().min());
        assert!(meta.iter().max() < learner.iter().min());
    }

    #[tokio::test]
    async fn test_concurrent_failure_stops_next_stage() {
        let scratch = tempfile::tempdir().unwrap();
        let orchestrator = PipelineOrchestrator::new(
            build_config(scratch.path()),
            StagePipeline::stacking(),
            RecordingExecutor {
                fail_on: Some((StageKind::Level1, fold(1))),
                ..Default::default()
            },
        )
        .with_jobs(5);

        assert!(orchestrator.run().await.is_err());
        let calls = orchestrator.executor().calls();
        assert!(position(&calls, StageKind::MetaFeatures).is_empty());
        assert!(position(&calls, StageKind::MetaLearner).is_empty());
    }
}
