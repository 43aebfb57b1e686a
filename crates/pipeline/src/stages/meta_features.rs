//! Stage that turns level-1 predictions into meta-feature files.

use crate::error::Result;
use crate::invocation::StageInvocation;
use crate::traits::{Stage, require_fold};
use experiment::{RunConfiguration, StageKind, Target};

pub const META_FEATURE_SCRIPT: &str = "generate_weka.py";

/// Invokes `generate_weka.py [-a LIST] -i {level-1 dir} [-u USERS] [-t ITEMS] -f {train} -e {test} -o {output}/wekaout{i}`
///
/// The generator appends `train.arff` / `test.arff` to the `-o` prefix.
pub struct MetaFeatureStage;

impl Stage for MetaFeatureStage {
    fn name(&self) -> &str {
        "MetaFeatureStage"
    }

    fn kind(&self) -> StageKind {
        StageKind::MetaFeatures
    }

    fn build(&self, config: &RunConfiguration, target: Target) -> Result<StageInvocation> {
        let fold = require_fold(self.kind(), target)?;
        let paths = config.paths();
        let level1_output = paths.level1_output(fold);

        StageInvocation::builder(
            self.kind(),
            target,
            config.tools().tools_dir.join(META_FEATURE_SCRIPT),
        )
        .algorithms(config.algorithm_mode())
        .flag_path("-i", &level1_output)
        .optional_flag("-u", config.user_attributes_path())
        .optional_flag("-t", config.item_attributes_path())
        .flag_path("-f", &paths.fold_train(fold))
        .flag_path("-e", &paths.fold_test(fold))
        .flag_path("-o", &paths.meta_feature_prefix(fold))
        .input(level1_output)
        .input(paths.fold_train(fold))
        .input(paths.fold_test(fold))
        .optional_input(config.user_attributes_path())
        .optional_input(config.item_attributes_path())
        .outputs(paths.outputs(self.kind(), target))
        .completion_marker(paths.completion_marker(self.kind(), target))
        .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use experiment::{FoldIndex, RunOptions};
    use std::path::{Path, PathBuf};

    fn config(output: &Path) -> RunConfiguration {
        RunConfiguration::resolve(RunOptions {
            dataset: Some(PathBuf::from("ratings.dat")),
            output: Some(output.to_path_buf()),
            meta_learner: Some(PathBuf::from("weka.jar")),
            user_attributes: Some(PathBuf::from("users.dat")),
            algorithms: Some("SlopeOne".to_string()),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_meta_feature_invocation() {
        let scratch = tempfile::tempdir().unwrap();
        let config = config(scratch.path());
        let fold = FoldIndex::new(4).unwrap();

        let invocation = MetaFeatureStage.build(&config, Target::Fold(fold)).unwrap();

        assert_eq!(invocation.algorithms(), Some("SlopeOne"));
        assert_eq!(
            invocation.flag_value("-i"),
            Some(scratch.path().join("lvl1out").join("r4").as_os_str())
        );
        assert_eq!(
            invocation.flag_value("-f"),
            Some(scratch.path().join("lvl1cv").join("r4_train").as_os_str())
        );
        assert_eq!(
            invocation.flag_value("-o"),
            Some(scratch.path().join("wekaout4").as_os_str())
        );
        assert_eq!(
            invocation.outputs(),
            [
                scratch.path().join("wekaout4train.arff"),
                scratch.path().join("wekaout4test.arff"),
            ]
        );
        assert_eq!(invocation.flag_value("-t"), None);
    }

    #[test]
    fn test_does_not_create_directories() {
        let scratch = tempfile::tempdir().unwrap();
        let config = config(scratch.path());

        MetaFeatureStage
            .build(&config, Target::Fold(FoldIndex::new(1).unwrap()))
            .unwrap();
        assert!(!scratch.path().join("lvl1out").exists());
    }
}
