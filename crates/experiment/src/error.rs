//! Error types for the experiment crate.
//!
//! Everything that can go wrong before the first external command is issued
//! ends up here: missing required options, a malformed algorithm list, or an
//! output tree that cannot be created.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while resolving a run configuration
#[derive(Error, Debug)]
pub enum ConfigurationError {
    /// A required command-line option was not given (or was empty)
    #[error("missing required option -{flag} ({description})")]
    MissingOption {
        flag: char,
        description: &'static str,
    },

    /// The `-a` list contained an empty entry, e.g. `UserKNN,,ItemKNN`
    #[error("algorithm list {list:?} contains an empty name")]
    EmptyAlgorithmName { list: String },

    /// The output tree could not be materialized
    #[error("failed to create directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, ConfigurationError>;
