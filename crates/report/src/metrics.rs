//! Error metrics over meta-learner predictions.

use crate::parser::Prediction;
use experiment::FoldIndex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Mean absolute and root-mean-square error over a set of predictions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ErrorMetrics {
    pub count: usize,
    pub mae: f64,
    pub rmse: f64,
}

impl ErrorMetrics {
    /// Metrics over rows with both an actual and a predicted value.
    ///
    /// Returns `None` if there is no such row.
    pub fn from_predictions(predictions: &[Prediction]) -> Option<Self> {
        let (count, abs_sum, sq_sum) = predictions
            .iter()
            .filter_map(Prediction::scored)
            .fold((0usize, 0.0f64, 0.0f64), |(n, abs, sq), (actual, predicted)| {
                let err = predicted - actual;
                (n + 1, abs + err.abs(), sq + err * err)
            });

        (count > 0).then(|| Self {
            count,
            mae: abs_sum / count as f64,
            rmse: (sq_sum / count as f64).sqrt(),
        })
    }

    /// Combine per-fold metrics as if all predictions were in one set
    pub fn pooled<'a>(parts: impl IntoIterator<Item = &'a ErrorMetrics>) -> Option<Self> {
        let (count, abs_sum, sq_sum) = parts
            .into_iter()
            .fold((0usize, 0.0f64, 0.0f64), |(n, abs, sq), m| {
                let c = m.count as f64;
                (n + m.count, abs + m.mae * c, sq + m.rmse * m.rmse * c)
            });

        (count > 0).then(|| Self {
            count,
            mae: abs_sum / count as f64,
            rmse: (sq_sum / count as f64).sqrt(),
        })
    }
}

/// Metrics for one fold's report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldReport {
    pub fold: FoldIndex,
    pub path: PathBuf,
    /// Rows without an actual or predicted value
    pub unscored: usize,
    pub metrics: ErrorMetrics,
}

/// Metrics for a whole run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub folds: Vec<FoldReport>,
    /// All folds' predictions taken together
    pub pooled: ErrorMetrics,
    /// Unweighted mean of the per-fold RMSE
    pub mean_rmse: f64,
    /// Unweighted mean of the per-fold MAE
    pub mean_mae: f64,
}

impl RunSummary {
    /// `None` when `folds` is empty
    pub fn from_folds(folds: Vec<FoldReport>) -> Option<Self> {
        let pooled = ErrorMetrics::pooled(folds.iter().map(|f| &f.metrics))?;
        let n = folds.len() as f64;
        let mean_rmse = folds.iter().map(|f| f.metrics.rmse).sum::<f64>() / n;
        let mean_mae = folds.iter().map(|f| f.metrics.mae).sum::<f64>() / n;

        Some(Self {
            folds,
            pooled,
            mean_rmse,
            mean_mae,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prediction(actual: Option<f64>, predicted: Option<f64>) -> Prediction {
        Prediction {
            instance: 1,
            actual,
            predicted,
            attribute: None,
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_error_metrics() {
        let predictions = vec![
            prediction(Some(4.0), Some(3.0)),
            prediction(Some(2.0), Some(5.0)),
            prediction(None, Some(1.0)),
        ];
        let metrics = ErrorMetrics::from_predictions(&predictions).unwrap();

        assert_eq!(metrics.count, 2);
        assert!(approx(metrics.mae, 2.0));
        assert!(approx(metrics.rmse, 5.0f64.sqrt()));
    }

    #[test]
    fn test_no_scorable_rows() {
        assert!(ErrorMetrics::from_predictions(&[]).is_none());
        assert!(ErrorMetrics::from_predictions(&[prediction(None, Some(3.0))]).is_none());
    }

    #[test]
    fn test_pooled_matches_combined() {
        let a = vec![prediction(Some(4.0), Some(3.0))];
        let b = vec![
            prediction(Some(2.0), Some(5.0)),
            prediction(Some(3.0), Some(3.0)),
        ];
        let all: Vec<Prediction> = a.iter().chain(&b).cloned().collect();

        let parts = [
            ErrorMetrics::from_predictions(&a).unwrap(),
            ErrorMetrics::from_predictions(&b).unwrap(),
        ];
        let pooled = ErrorMetrics::pooled(&parts).unwrap();
        let direct = ErrorMetrics::from_predictions(&all).unwrap();

        assert_eq!(pooled.count, 3);
        assert!(approx(pooled.mae, direct.mae));
        assert!(approx(pooled.rmse, direct.rmse));
    }

    #[test]
    fn test_summary_means() {
        let fold = |i: u8, rmse: f64| FoldReport {
            fold: FoldIndex::new(i).unwrap(),
            path: PathBuf::from(format!("streamout{i}.txt")),
            unscored: 0,
            metrics: ErrorMetrics {
                count: 10,
                mae: rmse / 2.0,
                rmse,
            },
        };

        let summary = RunSummary::from_folds(vec![fold(1, 1.0), fold(2, 3.0)]).unwrap();
        assert!(approx(summary.mean_rmse, 2.0));
        assert!(approx(summary.mean_mae, 1.0));
        assert_eq!(summary.pooled.count, 20);
        assert!(approx(summary.pooled.rmse, 5.0f64.sqrt()));

        assert!(RunSummary::from_folds(Vec::new()).is_none());
    }
}
