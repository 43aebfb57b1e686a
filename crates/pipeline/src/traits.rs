//! Core traits for the stage pipeline.
//!
//! This module defines the Stage trait: each external collaborator of a run
//! (fold splitter, level-1 runner, meta-feature generator, meta-learner) is
//! described by one implementation that knows how to build its invocations.

use crate::error::{Result, StageError};
use crate::invocation::StageInvocation;
use experiment::{FoldIndex, RunConfiguration, StageKind, Target};

/// One stage of a stacked cross-validation run.
///
/// ## Design Note
/// - `build` is a function of the configuration and the target only, so the
///   same call always yields the same invocation
/// - Building may create the target's output directory; it never runs anything
pub trait Stage: Send + Sync {
    /// Returns the name of this stage (for logging/debugging)
    fn name(&self) -> &str;

    fn kind(&self) -> StageKind;

    /// What this stage runs over, in execution order. Defaults to every fold.
    fn targets(&self) -> Vec<Target> {
        Target::per_fold()
    }

    /// Build the invocation for one target.
    ///
    /// # Returns
    /// * `Ok(StageInvocation)` - A validated command descriptor
    /// * `Err` - If the target is not one this stage runs over, or an output
    ///   directory cannot be created
    fn build(&self, config: &RunConfiguration, target: Target) -> Result<StageInvocation>;
}

/// Fold of a per-fold target; per-fold stages reject `Target::Dataset`
pub(crate) fn require_fold(stage: StageKind, target: Target) -> Result<FoldIndex> {
    target.fold().ok_or_else(|| StageError::InvalidInvocation {
        stage,
        target,
        reason: "stage runs once per fold".to_string(),
    })
}
