//! Stage that runs the level-1 predictors on one fold.
//!
//! The per-fold output directory `{output}/lvl1out/r{i}/` is created when the
//! invocation for that fold is built, not before.

use crate::error::{Result, StageError};
use crate::invocation::StageInvocation;
use crate::traits::{Stage, require_fold};
use experiment::{RunConfiguration, StageKind, Target, ensure_dir};

pub const LEVEL1_SCRIPT: &str = "level1_predictors.py";

/// Invokes `level1_predictors.py [-a LIST] -t {fold prefix} -o {fold output} [-i ITEMS] [-u USERS]`
///
/// ## Inputs
/// The runner receives the fold prefix; the files behind it are the fold's
/// `_train` and `_test` splits, which are what this stage declares as inputs.
pub struct Level1Stage;

impl Stage for Level1Stage {
    fn name(&self) -> &str {
        "Level1Stage"
    }

    fn kind(&self) -> StageKind {
        StageKind::Level1
    }

    fn build(&self, config: &RunConfiguration, target: Target) -> Result<StageInvocation> {
        let fold = require_fold(self.kind(), target)?;
        let paths = config.paths();

        let output_dir = paths.level1_output(fold);
        ensure_dir(&output_dir).map_err(|source| StageError::Io {
            path: output_dir.clone(),
            source,
        })?;

        StageInvocation::builder(
            self.kind(),
            target,
            config.tools().tools_dir.join(LEVEL1_SCRIPT),
        )
        .algorithms(config.algorithm_mode())
        .flag_path("-t", &paths.fold_prefix(fold))
        .flag_path("-o", &output_dir)
        .optional_flag("-i", config.item_attributes_path())
        .optional_flag("-u", config.user_attributes_path())
        .input(paths.fold_train(fold))
        .input(paths.fold_test(fold))
        .optional_input(config.item_attributes_path())
        .optional_input(config.user_attributes_path())
        .output(output_dir)
        .completion_marker(paths.completion_marker(self.kind(), target))
        .build()
    }
}
