//! Error types for stage construction and execution.

use experiment::{StageKind, Target};
use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// A stage invocation could not be built, started, or did not succeed
#[derive(Error, Debug)]
pub enum StageError {
    /// The descriptor failed validation before anything was spawned
    #[error("invalid {stage} invocation for {target}: {reason}")]
    InvalidInvocation {
        stage: StageKind,
        target: Target,
        reason: String,
    },

    /// An input the stage declares is not on disk
    #[error("{stage} ({target}) needs {} which does not exist", .path.display())]
    MissingArtifact {
        stage: StageKind,
        target: Target,
        path: PathBuf,
    },

    /// The external program could not be started at all
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The external program ran and reported failure
    #[error("{stage} ({target}) exited with {status}")]
    Failed {
        stage: StageKind,
        target: Target,
        status: ExitStatus,
    },

    /// Two invocations of one stage would write the same path
    #[error("{stage} invocations for {first} and {second} both write {}", .path.display())]
    PathConflict {
        stage: StageKind,
        first: Target,
        second: Target,
        path: PathBuf,
    },

    /// Preparing an output location failed
    #[error("failed to prepare {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, StageError>;
