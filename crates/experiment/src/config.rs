//! Run configuration resolution.
//!
//! `RunOptions` is what the command line handed us, every field optional.
//! `RunConfiguration::resolve` validates it, settles the algorithm set, and
//! materializes the top of the output tree. After that the configuration is
//! read-only for the rest of the run.

use crate::catalog::{AlgorithmMode, AlgorithmSet, Catalog};
use crate::error::{ConfigurationError, Result};
use crate::paths::{PathConvention, ensure_dir};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Raw, unvalidated run options
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Comma-separated level-1 predictor list (`-a`)
    pub algorithms: Option<String>,
    /// Ratings dataset (`-i`)
    pub dataset: Option<PathBuf>,
    /// Output root (`-o`)
    pub output: Option<PathBuf>,
    /// Item attributes file (`-t`)
    pub item_attributes: Option<PathBuf>,
    /// User attributes file (`-u`)
    pub user_attributes: Option<PathBuf>,
    /// Meta-learner runtime, i.e. weka.jar (`-w`)
    pub meta_learner: Option<PathBuf>,
    /// Where per-fold meta-learner reports go; defaults to the working directory
    pub report_dir: Option<PathBuf>,
    pub tools: ToolSettings,
}

/// Locations of the external programs the stages shell out to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSettings {
    /// Directory holding generate_cv.py, level1_predictors.py and generate_weka.py
    pub tools_dir: PathBuf,
    /// JVM launcher for the meta-learner
    pub java: PathBuf,
    /// Value for the JVM's `-Xmx`
    pub java_heap: String,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            tools_dir: PathBuf::from("."),
            java: PathBuf::from("java"),
            java_heap: "2000m".to_string(),
        }
    }
}

/// Validated, immutable configuration for one pipeline run
#[derive(Debug, Clone)]
pub struct RunConfiguration {
    dataset_path: PathBuf,
    item_attributes_path: Option<PathBuf>,
    user_attributes_path: Option<PathBuf>,
    meta_learner_path: PathBuf,
    algorithm_set: AlgorithmSet,
    algorithm_mode: AlgorithmMode,
    tools: ToolSettings,
    paths: PathConvention,
}

impl RunConfiguration {
    /// Resolve options against the default 21-name catalog
    pub fn resolve(options: RunOptions) -> Result<Self> {
        Self::resolve_with_catalog(options, &Catalog::DEFAULT)
    }

    /// Resolve options against an arbitrary catalog.
    ///
    /// Creates `{output}/` and `{output}/lvl1cv/` if absent.
    pub fn resolve_with_catalog(options: RunOptions, catalog: &Catalog) -> Result<Self> {
        let dataset_path = required(options.dataset, 'i', "dataset path")?;
        let output_root = required(options.output, 'o', "output folder")?;
        let meta_learner_path = required(options.meta_learner, 'w', "meta-learner runtime")?;

        let algorithm_set = match options.algorithms {
            Some(list) => AlgorithmSet::parse(&list)?,
            None => AlgorithmSet::from_catalog(catalog),
        };
        for name in algorithm_set.unknown_names(catalog) {
            warn!("Algorithm {} is not in the catalog", name);
        }
        let algorithm_mode = algorithm_set.mode(catalog);

        let report_dir = non_empty(options.report_dir).unwrap_or_else(|| PathBuf::from("."));
        let config = Self {
            dataset_path,
            item_attributes_path: non_empty(options.item_attributes),
            user_attributes_path: non_empty(options.user_attributes),
            meta_learner_path,
            algorithm_set,
            algorithm_mode,
            tools: options.tools,
            paths: PathConvention::new(output_root, report_dir),
        };
        config.materialize()?;

        info!(
            "Resolved run: dataset={}, output={}, {} algorithm(s)",
            config.dataset_path.display(),
            config.output_root().display(),
            config.algorithm_set.len()
        );
        Ok(config)
    }

    fn materialize(&self) -> Result<()> {
        for dir in [self.paths.output_root().to_path_buf(), self.paths.fold_split_dir()] {
            ensure_dir(&dir).map_err(|source| ConfigurationError::CreateDir { path: dir, source })?;
        }
        Ok(())
    }

    pub fn dataset_path(&self) -> &Path {
        &self.dataset_path
    }

    pub fn output_root(&self) -> &Path {
        self.paths.output_root()
    }

    pub fn item_attributes_path(&self) -> Option<&Path> {
        self.item_attributes_path.as_deref()
    }

    pub fn user_attributes_path(&self) -> Option<&Path> {
        self.user_attributes_path.as_deref()
    }

    pub fn meta_learner_path(&self) -> &Path {
        &self.meta_learner_path
    }

    pub fn algorithm_set(&self) -> &AlgorithmSet {
        &self.algorithm_set
    }

    pub fn algorithm_mode(&self) -> &AlgorithmMode {
        &self.algorithm_mode
    }

    pub fn tools(&self) -> &ToolSettings {
        &self.tools
    }

    pub fn paths(&self) -> &PathConvention {
        &self.paths
    }
}

fn non_empty(value: Option<PathBuf>) -> Option<PathBuf> {
    value.filter(|p| !p.as_os_str().is_empty())
}

fn required(value: Option<PathBuf>, flag: char, description: &'static str) -> Result<PathBuf> {
    non_empty(value).ok_or(ConfigurationError::MissingOption { flag, description })
}
