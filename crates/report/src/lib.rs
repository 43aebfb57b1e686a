//! # Report Crate
//!
//! Turns the meta-learner's per-fold prediction listings into error metrics.
//!
//! ## Components
//!
//! - **parser**: reads `streamout{i}.txt` prediction rows
//! - **metrics**: MAE / RMSE per fold and across the run
//!
//! ## Example Usage
//!
//! ```ignore
//! let summary = report::summarize(config.paths())?;
//! report::write_summary(&summary, &config.paths().summary())?;
//! println!("pooled RMSE {:.4}", summary.pooled.rmse);
//! ```

pub mod error;
pub mod metrics;
pub mod parser;

pub use error::{ReportError, Result};
pub use metrics::{ErrorMetrics, FoldReport, RunSummary};
pub use parser::{Prediction, parse_predictions, read_predictions};

use experiment::{FoldIndex, PathConvention};
use rayon::prelude::*;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Parse one fold's report and compute its metrics
pub fn fold_report(fold: FoldIndex, path: &Path) -> Result<FoldReport> {
    let predictions = read_predictions(path)?;
    let metrics = ErrorMetrics::from_predictions(&predictions).ok_or_else(|| ReportError::Empty {
        path: path.to_path_buf(),
    })?;
    debug!(
        "Fold {}: {} predictions, RMSE {:.4}",
        fold, metrics.count, metrics.rmse
    );

    Ok(FoldReport {
        fold,
        path: path.to_path_buf(),
        unscored: predictions.len() - metrics.count,
        metrics,
    })
}

/// Parse every fold's report in parallel and summarize the run
pub fn summarize(paths: &PathConvention) -> Result<RunSummary> {
    let folds: Vec<FoldIndex> = FoldIndex::all().collect();

    let reports = folds
        .par_iter()
        .map(|&fold| fold_report(fold, &paths.report(fold)))
        .collect::<Result<Vec<_>>>()?;

    let summary = RunSummary::from_folds(reports).ok_or_else(|| ReportError::Empty {
        path: paths.report_dir().to_path_buf(),
    })?;
    info!(
        "Summarized {} folds: pooled RMSE {:.4}, MAE {:.4}",
        summary.folds.len(),
        summary.pooled.rmse,
        summary.pooled.mae
    );
    Ok(summary)
}

/// Write the summary as pretty-printed JSON
pub fn write_summary(summary: &RunSummary, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(summary)?;
    fs::write(path, json).map_err(|source| ReportError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_reports(dir: &Path) {
        for fold in FoldIndex::all() {
            let err = fold.get() as f64 / 10.0;
            let text = format!(
                "=== Predictions on test data ===\n\n inst#  actual  predicted  error (user)\n     1  3  {}  {} (1)\n     2  4  {}  {} (2)\n",
                3.0 + err,
                err,
                4.0 - err,
                -err
            );
            fs::write(dir.join(format!("streamout{fold}.txt")), text).unwrap();
        }
    }

    #[test]
    fn test_summarize_all_folds() {
        let scratch = tempfile::tempdir().unwrap();
        write_reports(scratch.path());
        let paths = PathConvention::new(scratch.path(), scratch.path());

        let summary = summarize(&paths).unwrap();

        assert_eq!(summary.folds.len(), 5);
        assert_eq!(summary.pooled.count, 10);
        let order: Vec<u8> = summary.folds.iter().map(|f| f.fold.get()).collect();
        assert_eq!(order, vec![1, 2, 3, 4, 5]);
        assert!((summary.folds[2].metrics.rmse - 0.3).abs() < 1e-9);
        assert!((summary.mean_rmse - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_missing_fold_report() {
        let scratch = tempfile::tempdir().unwrap();
        write_reports(scratch.path());
        fs::remove_file(scratch.path().join("streamout4.txt")).unwrap();
        let paths = PathConvention::new(scratch.path(), scratch.path());

        assert!(matches!(summarize(&paths), Err(ReportError::Read { .. })));
    }

    #[test]
    fn test_empty_fold_report() {
        let scratch = tempfile::tempdir().unwrap();
        let path = scratch.path().join("streamout1.txt");
        fs::write(&path, "=== Predictions on test data ===\n").unwrap();

        let fold = FoldIndex::new(1).unwrap();
        assert!(matches!(fold_report(fold, &path), Err(ReportError::Empty { .. })));
    }

    #[test]
    fn test_write_summary() {
        let scratch = tempfile::tempdir().unwrap();
        write_reports(scratch.path());
        let paths = PathConvention::new(scratch.path(), scratch.path());
        let summary = summarize(&paths).unwrap();

        write_summary(&summary, &paths.summary()).unwrap();

        let text = fs::read_to_string(paths.summary()).unwrap();
        let parsed: RunSummary = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.folds.len(), 5);
        assert_eq!(parsed.pooled.count, summary.pooled.count);
    }
}
