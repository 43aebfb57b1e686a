//! Core domain types for a stacked cross-validation run.
//!
//! A run is a fixed grid: four stages, five folds. The types here name the
//! coordinates of that grid so the rest of the workspace never passes bare
//! integers or stage strings around.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// Folds
// =============================================================================

/// Number of folds the fold splitter produces. Not configurable.
pub const FOLD_COUNT: u8 = 5;

/// One-based index of a cross-validation fold (1..=5)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8")]
pub struct FoldIndex(u8);

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("fold index {0} is outside 1..=5")]
pub struct InvalidFoldIndex(pub u8);

impl TryFrom<u8> for FoldIndex {
    type Error = InvalidFoldIndex;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        Self::new(index).ok_or(InvalidFoldIndex(index))
    }
}

impl FoldIndex {
    /// Returns `None` for anything outside 1..=FOLD_COUNT
    pub fn new(index: u8) -> Option<Self> {
        (1..=FOLD_COUNT).contains(&index).then_some(Self(index))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Every fold, in ascending order
    pub fn all() -> impl Iterator<Item = FoldIndex> {
        (1..=FOLD_COUNT).map(FoldIndex)
    }
}

impl fmt::Display for FoldIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Stages
// =============================================================================

/// The four external stages of a run, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StageKind {
    FoldSplit,
    Level1,
    MetaFeatures,
    MetaLearner,
}

impl StageKind {
    /// Stages in the order they must run
    pub const ORDER: [StageKind; 4] = [
        StageKind::FoldSplit,
        StageKind::Level1,
        StageKind::MetaFeatures,
        StageKind::MetaLearner,
    ];

    pub fn name(self) -> &'static str {
        match self {
            StageKind::FoldSplit => "fold-split",
            StageKind::Level1 => "level1",
            StageKind::MetaFeatures => "meta-features",
            StageKind::MetaLearner => "meta-learner",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a single stage invocation works on
///
/// The fold splitter runs once over the whole dataset; every other stage runs
/// once per fold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    Dataset,
    Fold(FoldIndex),
}

impl Target {
    pub fn fold(self) -> Option<FoldIndex> {
        match self {
            Target::Dataset => None,
            Target::Fold(fold) => Some(fold),
        }
    }

    /// Folds covered by this target
    pub fn folds(self) -> Vec<FoldIndex> {
        match self {
            Target::Dataset => FoldIndex::all().collect(),
            Target::Fold(fold) => vec![fold],
        }
    }

    /// One target per fold, ascending
    pub fn per_fold() -> Vec<Target> {
        FoldIndex::all().map(Target::Fold).collect()
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Dataset => f.write_str("dataset"),
            Target::Fold(fold) => write!(f, "fold {fold}"),
        }
    }
}
