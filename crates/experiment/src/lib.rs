//! # Experiment Crate
//!
//! Data model for a stacked-ensemble cross-validation run.
//!
//! ## Main Components
//!
//! - **types**: folds, stage kinds and invocation targets
//! - **catalog**: the level-1 predictor catalog and algorithm set selection
//! - **paths**: the naming convention tying each stage's outputs to the next stage's inputs
//! - **config**: resolving command-line options into a `RunConfiguration`
//! - **error**: `ConfigurationError`
//!
//! ## Example Usage
//!
//! ```ignore
//! use experiment::{RunConfiguration, RunOptions, FoldIndex};
//!
//! let config = RunConfiguration::resolve(RunOptions {
//!     dataset: Some("ratings.dat".into()),
//!     output: Some("out".into()),
//!     meta_learner: Some("weka.jar".into()),
//!     ..Default::default()
//! })?;
//!
//! for fold in FoldIndex::all() {
//!     println!("{}", config.paths().level1_output(fold).display());
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod paths;
pub mod types;

pub use catalog::{AlgorithmMode, AlgorithmSet, Catalog, DEFAULT_ALGORITHMS};
pub use config::{RunConfiguration, RunOptions, ToolSettings};
pub use error::{ConfigurationError, Result};
pub use paths::{MARKER_DIR, PathConvention, ensure_dir};
pub use types::{FOLD_COUNT, FoldIndex, InvalidFoldIndex, StageKind, Target};
