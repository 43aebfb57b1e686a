//! Level-1 predictor catalog and algorithm set selection.
//!
//! Downstream stages accept an optional `-a name,name,...` argument. When it is
//! absent they fall back to their own default, which is assumed to be the full
//! catalog. Whether the argument is emitted is decided here.

use crate::error::{ConfigurationError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::warn;

/// The 21 level-1 predictors a run uses when no subset is given.
///
/// Order only matters for display.
pub const DEFAULT_ALGORITHMS: [&str; 21] = [
    "BiPolarSlopeOne",
    "FactorWiseMatrixFactorization",
    "GlobalAverage",
    "ItemAttributeKNN",
    "ItemAverage",
    "ItemKNN",
    "MatrixFactorization",
    "SlopeOne",
    "UserAttributeKNN",
    "UserAverage",
    "UserItemBaseline",
    "UserKNN",
    "TimeAwareBaseline",
    "TimeAwareBaselineWithFrequencies",
    "CoClustering",
    "LatentFeatureLogLinearModel",
    "BiasedMatrixFactorization",
    "SVDPlusPlus",
    "SigmoidSVDPlusPlus",
    "SigmoidItemAsymmetricFactorModel",
    "SigmoidUserAsymmetricFactorModel",
];

/// A fixed table of known predictor names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Catalog {
    names: &'static [&'static str],
}

impl Catalog {
    pub const DEFAULT: Catalog = Catalog {
        names: &DEFAULT_ALGORITHMS,
    };

    pub const fn new(names: &'static [&'static str]) -> Self {
        Self { names }
    }

    pub fn names(&self) -> &'static [&'static str] {
        self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(&name)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Ordered list of level-1 predictor names for one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlgorithmSet {
    names: Vec<String>,
}

impl AlgorithmSet {
    /// The whole catalog, in catalog order
    pub fn from_catalog(catalog: &Catalog) -> Self {
        Self {
            names: catalog.names().iter().map(|n| n.to_string()).collect(),
        }
    }

    /// Parse a comma-separated list as given to `-a`.
    ///
    /// Surrounding whitespace is trimmed per entry; empty entries are rejected.
    pub fn parse(list: &str) -> Result<Self> {
        let names: Vec<String> = list.split(',').map(|n| n.trim().to_string()).collect();
        if names.iter().any(|n| n.is_empty()) {
            return Err(ConfigurationError::EmptyAlgorithmName {
                list: list.to_string(),
            });
        }
        Ok(Self { names })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Comma-joined form used on downstream command lines
    pub fn joined(&self) -> String {
        self.names.join(",")
    }

    /// Names not present in `catalog`
    pub fn unknown_names<'a>(&'a self, catalog: &Catalog) -> Vec<&'a str> {
        self.names
            .iter()
            .map(String::as_str)
            .filter(|n| !catalog.contains(n))
            .collect()
    }

    /// Decide how downstream commands receive the algorithm set.
    ///
    /// Only the cardinality is compared with the catalog: any set with exactly
    /// `catalog.len()` names is treated as the default, even when the names
    /// differ. Existing experiment scripts depend on this, so it is kept and
    /// only reported.
    pub fn mode(&self, catalog: &Catalog) -> AlgorithmMode {
        if self.names.len() != catalog.len() {
            return AlgorithmMode::Explicit(self.joined());
        }

        let ours: BTreeSet<&str> = self.names.iter().map(String::as_str).collect();
        let theirs: BTreeSet<&str> = catalog.names().iter().copied().collect();
        if ours != theirs {
            warn!(
                "algorithm set has {} names but differs from the catalog; \
                 downstream stages will run their default set instead",
                self.names.len()
            );
        }
        AlgorithmMode::CatalogDefault
    }
}

/// How the algorithm set is passed to downstream stages
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlgorithmMode {
    /// Omit `-a`; stages use their built-in default
    CatalogDefault,
    /// Pass `-a` with this comma-joined list
    Explicit(String),
}

impl AlgorithmMode {
    /// Value for the `-a` flag, if one should be emitted
    pub fn argument(&self) -> Option<&str> {
        match self {
            AlgorithmMode::CatalogDefault => None,
            AlgorithmMode::Explicit(list) => Some(list),
        }
    }
}
