//! Error types for the report crate.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading meta-learner reports or writing the summary
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("failed to read report {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A line that looks like a prediction row could not be parsed
    #[error("malformed prediction at line {line} in {}: {reason}", .path.display())]
    MalformedRow {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// The report has no row with both an actual and a predicted value
    #[error("report {} contains no scorable predictions", .path.display())]
    Empty { path: PathBuf },

    #[error("failed to serialize summary: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, ReportError>;
