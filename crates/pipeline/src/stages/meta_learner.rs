//! Stage that trains and evaluates the level-2 regression on one fold.
//!
//! The meta-learner is Weka's linear regression wrapped in a filter that drops
//! non-numeric attributes. Its prediction listing goes to
//! `{report_dir}/streamout{i}.txt`.

use crate::error::{Result, StageError};
use crate::invocation::StageInvocation;
use crate::traits::{Stage, require_fold};
use experiment::{RunConfiguration, StageKind, Target, ensure_dir};
use std::env;
use std::path::Path;

const CLASSIFIER: &str = "weka.classifiers.meta.FilteredClassifier";
const FILTER: &str = "weka.filters.unsupervised.attribute.RemoveType";
const REGRESSOR: &str = "weka.classifiers.functions.LinearRegression";

/// Invokes `java -Xmx{heap} -cp {weka.jar} FilteredClassifier ... -t {train} -T {test} -i -k -p 1 > streamout{i}.txt`
pub struct MetaLearnerStage;

impl Stage for MetaLearnerStage {
    fn name(&self) -> &str {
        "MetaLearnerStage"
    }

    fn kind(&self) -> StageKind {
        StageKind::MetaLearner
    }

    fn build(&self, config: &RunConfiguration, target: Target) -> Result<StageInvocation> {
        let fold = require_fold(self.kind(), target)?;
        let paths = config.paths();
        let tools = config.tools();

        ensure_dir(paths.report_dir()).map_err(|source| StageError::Io {
            path: paths.report_dir().to_path_buf(),
            source,
        })?;

        StageInvocation::builder(self.kind(), target, tools.java.clone())
            .arg(format!("-Xmx{}", tools.java_heap))
            .flag_path("-cp", config.meta_learner_path())
            .arg(CLASSIFIER)
            .flag("-F", FILTER)
            .flag("-W", REGRESSOR)
            .flag_path("-t", &paths.meta_train(fold))
            .flag_path("-T", &paths.meta_test(fold))
            .arg("-i")
            .arg("-k")
            .flag("-p", "1")
            .optional_input(single_jar(config.meta_learner_path()))
            .input(paths.meta_train(fold))
            .input(paths.meta_test(fold))
            .stdout_to(paths.report(fold))
            .completion_marker(paths.completion_marker(self.kind(), target))
            .build()
    }
}

/// The `-w` value when it names one file. A multi-entry or wildcard
/// classpath is handed to java unchecked.
fn single_jar(classpath: &Path) -> Option<&Path> {
    let wildcard = classpath.to_string_lossy().contains('*');
    let entries = env::split_paths(classpath.as_os_str()).count();
    (!wildcard && entries == 1).then_some(classpath)
}
