//! Stage that splits the dataset into cross-validation folds.
//!
//! Runs once. The splitter writes `{prefix}{i}_train` and `{prefix}{i}_test`
//! for every fold under `{output}/lvl1cv/`.

use crate::error::{Result, StageError};
use crate::invocation::StageInvocation;
use crate::traits::Stage;
use experiment::{RunConfiguration, StageKind, Target};

/// Script name, resolved against the configured tools directory
pub const FOLD_SPLIT_SCRIPT: &str = "generate_cv.py";

/// Invokes `generate_cv.py -i {dataset} -o {output}/lvl1cv/r`
pub struct FoldSplitStage;

impl Stage for FoldSplitStage {
    fn name(&self) -> &str {
        "FoldSplitStage"
    }

    fn kind(&self) -> StageKind {
        StageKind::FoldSplit
    }

    fn targets(&self) -> Vec<Target> {
        vec![Target::Dataset]
    }

    fn build(&self, config: &RunConfiguration, target: Target) -> Result<StageInvocation> {
        if target != Target::Dataset {
            return Err(StageError::InvalidInvocation {
                stage: self.kind(),
                target,
                reason: "the fold splitter runs once over the whole dataset".to_string(),
            });
        }
        let paths = config.paths();

        StageInvocation::builder(
            self.kind(),
            target,
            config.tools().tools_dir.join(FOLD_SPLIT_SCRIPT),
        )
        .flag_path("-i", config.dataset_path())
        .flag_path("-o", &paths.fold_split_prefix())
        .input(config.dataset_path())
        .outputs(paths.outputs(self.kind(), target))
        .completion_marker(paths.completion_marker(self.kind(), target))
        .build()
    }
}
