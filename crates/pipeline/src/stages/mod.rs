//! Stage implementations for the stacking pipeline.
//!
//! This module contains one Stage per external program; together they are
//! composed into a StagePipeline.

pub mod fold_split;
pub mod level1;
pub mod meta_features;
pub mod meta_learner;

// Re-export for convenience
pub use fold_split::FoldSplitStage;
pub use level1::Level1Stage;
pub use meta_features::MetaFeatureStage;
pub use meta_learner::MetaLearnerStage;
