//! Stage construction for the stacked cross-validation pipeline.
//!
//! This crate provides:
//! - Stage trait and one implementation per external program
//! - StageInvocation, a typed and validated command descriptor
//! - StagePipeline for composing stages in order
//!
//! ## Architecture
//! A run goes through four stages, each a separate external program:
//! 1. FoldSplitStage splits the dataset into five train/test folds
//! 2. Level1Stage runs the base predictors on every fold
//! 3. MetaFeatureStage turns level-1 predictions into ARFF meta-features
//! 4. MetaLearnerStage fits the level-2 regression and writes a report per fold
//!
//! Nothing here spawns processes; see the `runner` crate for that.
//!
//! ## Example Usage
//! ```ignore
//! use pipeline::StagePipeline;
//!
//! let pipeline = StagePipeline::stacking();
//! for invocation in pipeline.plan(&config)? {
//!     println!("{}", invocation.command_line());
//! }
//! ```

pub mod error;
pub mod invocation;
pub mod stage_pipeline;
pub mod stages;
pub mod traits;

// Re-export main types
pub use error::{Result, StageError};
pub use invocation::{InvocationBuilder, StageInvocation, ensure_disjoint_outputs};
pub use stage_pipeline::StagePipeline;
pub use traits::Stage;
