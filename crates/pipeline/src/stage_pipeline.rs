//! The StagePipeline holds the ordered stages of a run.
//!
//! Stages are chained with the builder pattern; the pipeline only knows the
//! order and how to expand each stage into invocations. Running them is the
//! orchestrator's job.

use crate::error::Result;
use crate::invocation::StageInvocation;
use crate::stages::{FoldSplitStage, Level1Stage, MetaFeatureStage, MetaLearnerStage};
use crate::traits::Stage;
use experiment::RunConfiguration;
use tracing::debug;

/// Ordered list of stages.
///
/// ## Usage
/// ```ignore
/// let pipeline = StagePipeline::new()
///     .add_stage(FoldSplitStage)
///     .add_stage(Level1Stage)
///     .add_stage(MetaFeatureStage)
///     .add_stage(MetaLearnerStage);
///
/// for invocation in pipeline.plan(&config)? {
///     println!("{}", invocation.command_line());
/// }
/// ```
pub struct StagePipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl StagePipeline {
    /// Create a new empty StagePipeline.
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// The full stacking run: split, level-1, meta-features, meta-learner
    pub fn stacking() -> Self {
        Self::new()
            .add_stage(FoldSplitStage)
            .add_stage(Level1Stage)
            .add_stage(MetaFeatureStage)
            .add_stage(MetaLearnerStage)
    }

    /// Add a stage to the end of the pipeline (builder pattern).
    pub fn add_stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn stages(&self) -> &[Box<dyn Stage>] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Expand every stage into its invocations, in execution order.
    ///
    /// Building is not free of side effects: per-fold output directories are
    /// created as their invocations are built.
    pub fn plan(&self, config: &RunConfiguration) -> Result<Vec<StageInvocation>> {
        let mut invocations = Vec::new();
        for stage in &self.stages {
            for target in stage.targets() {
                let invocation = stage.build(config, target)?;
                debug!("Planned {} for {}: {}", stage.name(), target, invocation.command_line());
                invocations.push(invocation);
            }
        }
        Ok(invocations)
    }
}

impl Default for StagePipeline {
    fn default() -> Self {
        Self::new()
    }
}
