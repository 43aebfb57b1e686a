//! File-naming convention binding stage outputs to stage inputs.
//!
//! Every method is a pure function of the roots and the fold index. The same
//! method is used on both sides of a stage boundary, so the level-1 output
//! directory handed to the meta-feature generator is the exact path the
//! level-1 runner was told to write to.

use crate::types::{FoldIndex, StageKind, Target};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the fold-split directory under the output root
pub const FOLD_SPLIT_DIR: &str = "lvl1cv";
/// Name of the level-1 output directory under the output root
pub const LEVEL1_DIR: &str = "lvl1out";
/// Completion markers for resumed runs
pub const MARKER_DIR: &str = ".done";

/// Maps (stage, fold) to paths under a run's output tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathConvention {
    output_root: PathBuf,
    report_dir: PathBuf,
}

impl PathConvention {
    pub fn new(output_root: impl Into<PathBuf>, report_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
            report_dir: report_dir.into(),
        }
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    pub fn report_dir(&self) -> &Path {
        &self.report_dir
    }

    // Fold splitter

    pub fn fold_split_dir(&self) -> PathBuf {
        self.output_root.join(FOLD_SPLIT_DIR)
    }

    /// Prefix handed to the fold splitter; it appends `{i}_train` / `{i}_test`
    pub fn fold_split_prefix(&self) -> PathBuf {
        self.fold_split_dir().join("r")
    }

    /// Per-fold prefix handed to the level-1 runner
    pub fn fold_prefix(&self, fold: FoldIndex) -> PathBuf {
        self.fold_split_dir().join(format!("r{fold}"))
    }

    pub fn fold_train(&self, fold: FoldIndex) -> PathBuf {
        self.fold_split_dir().join(format!("r{fold}_train"))
    }

    pub fn fold_test(&self, fold: FoldIndex) -> PathBuf {
        self.fold_split_dir().join(format!("r{fold}_test"))
    }

    // Level-1

    pub fn level1_root(&self) -> PathBuf {
        self.output_root.join(LEVEL1_DIR)
    }

    pub fn level1_output(&self, fold: FoldIndex) -> PathBuf {
        self.level1_root().join(format!("r{fold}"))
    }

    // Meta-features

    /// Prefix handed to the meta-feature generator; it appends `train.arff` / `test.arff`
    pub fn meta_feature_prefix(&self, fold: FoldIndex) -> PathBuf {
        self.output_root.join(format!("wekaout{fold}"))
    }

    pub fn meta_train(&self, fold: FoldIndex) -> PathBuf {
        self.output_root.join(format!("wekaout{fold}train.arff"))
    }

    pub fn meta_test(&self, fold: FoldIndex) -> PathBuf {
        self.output_root.join(format!("wekaout{fold}test.arff"))
    }

    // Meta-learner

    pub fn report(&self, fold: FoldIndex) -> PathBuf {
        self.report_dir.join(format!("streamout{fold}.txt"))
    }

    pub fn summary(&self) -> PathBuf {
        self.output_root.join("summary.json")
    }

    /// Written by the executor once `stage` succeeded for `target`.
    ///
    /// Resume only trusts outputs that have one; a failed program can leave
    /// partial files behind.
    pub fn completion_marker(&self, stage: StageKind, target: Target) -> PathBuf {
        let name = match target.fold() {
            Some(fold) => format!("{}-r{fold}", stage.name()),
            None => format!("{}-dataset", stage.name()),
        };
        self.output_root.join(MARKER_DIR).join(name)
    }

    /// Everything `stage` writes for `target`
    pub fn outputs(&self, stage: StageKind, target: Target) -> Vec<PathBuf> {
        target
            .folds()
            .into_iter()
            .flat_map(|fold| match stage {
                StageKind::FoldSplit => vec![self.fold_train(fold), self.fold_test(fold)],
                StageKind::Level1 => vec![self.level1_output(fold)],
                StageKind::MetaFeatures => vec![self.meta_train(fold), self.meta_test(fold)],
                StageKind::MetaLearner => vec![self.report(fold)],
            })
            .collect()
    }
}

/// Create `path` (and parents) unless it already exists. Never touches content.
pub fn ensure_dir(path: &Path) -> io::Result<()> {
    if path.is_dir() {
        return Ok(());
    }
    debug!("Creating directory {}", path.display());
    fs::create_dir_all(path)
}
