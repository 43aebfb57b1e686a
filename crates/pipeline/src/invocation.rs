//! Typed descriptors for one call of an external stage program.
//!
//! A `StageInvocation` carries the program, its argument vector, and the
//! artifacts it reads and writes. Arguments are kept as separate `OsString`s
//! and are never joined into a shell string for execution; `command_line` only
//! renders them for logs and dry runs.

use crate::error::{Result, StageError};
use experiment::{AlgorithmMode, StageKind, Target};
use std::collections::HashMap;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// One fully-specified call of an external stage program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageInvocation {
    stage: StageKind,
    target: Target,
    program: PathBuf,
    args: Vec<OsString>,
    inputs: Vec<PathBuf>,
    outputs: Vec<PathBuf>,
    stdout: Option<PathBuf>,
    algorithms: Option<String>,
    marker: Option<PathBuf>,
}

impl StageInvocation {
    pub fn builder(stage: StageKind, target: Target, program: impl Into<PathBuf>) -> InvocationBuilder {
        InvocationBuilder {
            invocation: StageInvocation {
                stage,
                target,
                program: program.into(),
                args: Vec::new(),
                inputs: Vec::new(),
                outputs: Vec::new(),
                stdout: None,
                algorithms: None,
                marker: None,
            },
        }
    }

    pub fn stage(&self) -> StageKind {
        self.stage
    }

    pub fn target(&self) -> Target {
        self.target
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    /// Artifacts that must exist before the program starts
    pub fn inputs(&self) -> &[PathBuf] {
        &self.inputs
    }

    /// Artifacts the program produces (including the stdout target)
    pub fn outputs(&self) -> &[PathBuf] {
        &self.outputs
    }

    /// File that receives the program's standard output, if redirected
    pub fn stdout(&self) -> Option<&Path> {
        self.stdout.as_deref()
    }

    /// The comma-joined `-a` value, when one is passed
    pub fn algorithms(&self) -> Option<&str> {
        self.algorithms.as_deref()
    }

    /// File written after the program succeeded, if one is declared
    pub fn completion_marker(&self) -> Option<&Path> {
        self.marker.as_deref()
    }

    /// Value following `flag` in the argument vector
    pub fn flag_value(&self, flag: &str) -> Option<&OsStr> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(OsString::as_os_str)
    }

    pub fn missing_inputs(&self) -> Vec<&Path> {
        self.inputs
            .iter()
            .map(PathBuf::as_path)
            .filter(|p| !p.exists())
            .collect()
    }

    /// True when every declared output is present and non-empty, and the
    /// completion marker (if declared) says the program finished successfully
    pub fn outputs_complete(&self) -> bool {
        !self.outputs.is_empty()
            && self.outputs.iter().all(|p| artifact_present(p))
            && self.marker.as_deref().is_none_or(Path::is_file)
    }

    /// Record a successful run by writing the completion marker
    pub fn mark_complete(&self) -> Result<()> {
        let Some(marker) = &self.marker else {
            return Ok(());
        };
        let io_error = |source: io::Error| StageError::Io {
            path: marker.clone(),
            source,
        };
        if let Some(parent) = marker.parent() {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        fs::write(marker, format!("{}\n", self.command_line())).map_err(io_error)
    }

    /// Forget an earlier success before the program runs again
    pub fn clear_completion(&self) -> Result<()> {
        let Some(marker) = &self.marker else {
            return Ok(());
        };
        match fs::remove_file(marker) {
            Err(err) if err.kind() != io::ErrorKind::NotFound => Err(StageError::Io {
                path: marker.clone(),
                source: err,
            }),
            _ => Ok(()),
        }
    }

    /// Shell-style rendering for logs and dry runs
    pub fn command_line(&self) -> String {
        let mut parts = vec![quote(self.program.as_os_str())];
        parts.extend(self.args.iter().map(|a| quote(a)));
        if let Some(stdout) = &self.stdout {
            parts.push(">".to_string());
            parts.push(quote(stdout.as_os_str()));
        }
        parts.join(" ")
    }
}

/// Builder for `StageInvocation`; `build` validates the result
pub struct InvocationBuilder {
    invocation: StageInvocation,
}

impl InvocationBuilder {
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.invocation.args.push(arg.into());
        self
    }

    pub fn flag(self, flag: &str, value: impl Into<OsString>) -> Self {
        self.arg(flag).arg(value)
    }

    pub fn flag_path(self, flag: &str, path: &Path) -> Self {
        self.flag(flag, path.as_os_str())
    }

    /// Emit `flag path` only when `path` is present
    pub fn optional_flag(self, flag: &str, path: Option<&Path>) -> Self {
        match path {
            Some(path) => self.flag_path(flag, path),
            None => self,
        }
    }

    /// Emit `-a list` unless the mode falls back to the stage default
    pub fn algorithms(mut self, mode: &AlgorithmMode) -> Self {
        if let Some(list) = mode.argument() {
            self.invocation.algorithms = Some(list.to_string());
            self = self.flag("-a", list);
        }
        self
    }

    pub fn input(mut self, path: impl Into<PathBuf>) -> Self {
        self.invocation.inputs.push(path.into());
        self
    }

    pub fn optional_input(self, path: Option<&Path>) -> Self {
        match path {
            Some(path) => self.input(path),
            None => self,
        }
    }

    pub fn output(mut self, path: impl Into<PathBuf>) -> Self {
        self.invocation.outputs.push(path.into());
        self
    }

    pub fn outputs(mut self, paths: impl IntoIterator<Item = PathBuf>) -> Self {
        self.invocation.outputs.extend(paths);
        self
    }

    /// Redirect standard output into `path`; the file counts as an output
    pub fn stdout_to(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        self.invocation.outputs.push(path.clone());
        self.invocation.stdout = Some(path);
        self
    }

    /// Declare the file that marks this invocation as finished
    pub fn completion_marker(mut self, path: impl Into<PathBuf>) -> Self {
        self.invocation.marker = Some(path.into());
        self
    }

    pub fn build(self) -> Result<StageInvocation> {
        let inv = self.invocation;
        let invalid = |reason: String| StageError::InvalidInvocation {
            stage: inv.stage,
            target: inv.target,
            reason,
        };

        if inv.program.as_os_str().is_empty() {
            return Err(invalid("empty program path".to_string()));
        }
        if let Some(i) = inv.args.iter().position(|a| a.is_empty()) {
            return Err(invalid(format!("argument {i} is empty")));
        }
        if inv.outputs.is_empty() {
            return Err(invalid("no declared outputs".to_string()));
        }
        if inv.inputs.iter().chain(&inv.outputs).any(|p| p.as_os_str().is_empty()) {
            return Err(invalid("empty artifact path".to_string()));
        }
        if let Some(marker) = &inv.marker {
            if inv.inputs.contains(marker) || inv.outputs.contains(marker) {
                return Err(invalid(format!("{} is also an artifact", marker.display())));
            }
        }
        for (i, output) in inv.outputs.iter().enumerate() {
            if inv.outputs[..i].contains(output) {
                return Err(invalid(format!("{} is declared twice", output.display())));
            }
            if inv.inputs.contains(output) {
                return Err(invalid(format!("{} is both input and output", output.display())));
            }
        }
        Ok(inv)
    }
}

/// Fail if two invocations would write the same path
pub fn ensure_disjoint_outputs(invocations: &[StageInvocation]) -> Result<()> {
    let mut owners: HashMap<&Path, &StageInvocation> = HashMap::new();
    for invocation in invocations {
        for output in invocation.outputs() {
            if let Some(previous) = owners.insert(output.as_path(), invocation) {
                return Err(StageError::PathConflict {
                    stage: invocation.stage(),
                    first: previous.target(),
                    second: invocation.target(),
                    path: output.clone(),
                });
            }
        }
    }
    Ok(())
}

// A directory counts once it has an entry, a file once it has bytes
fn artifact_present(path: &Path) -> bool {
    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => fs::read_dir(path)
            .map(|mut entries| entries.next().is_some())
            .unwrap_or(false),
        Ok(meta) => meta.len() > 0,
        Err(_) => false,
    }
}

fn quote(arg: &OsStr) -> String {
    let text = arg.to_string_lossy();
    let plain = !text.is_empty()
        && text
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./,:=+@%".contains(c));
    if plain {
        text.into_owned()
    } else {
        format!("'{}'", text.replace('\'', r"'\''"))
    }
}
