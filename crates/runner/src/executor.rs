//! Executors turn a `StageInvocation` into an actual process (or not).
//!
//! The orchestrator calls `execute` from tokio's blocking pool, so
//! implementations may block for as long as the external program runs.

use pipeline::{StageError, StageInvocation};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::info;

/// Runs one stage invocation to completion
pub trait Executor: Send + Sync + 'static {
    fn execute(&self, invocation: &StageInvocation) -> pipeline::Result<()>;
}

/// Spawns the external program and waits for it.
///
/// Inputs are checked first; stdin and stderr are inherited so the program's
/// own diagnostics reach the operator unchanged. Redirected output goes to a
/// `.partial` file that is renamed into place only on success, and the
/// invocation's completion marker is written last.
pub struct ProcessExecutor;

impl Executor for ProcessExecutor {
    fn execute(&self, invocation: &StageInvocation) -> pipeline::Result<()> {
        if let Some(missing) = invocation.missing_inputs().first() {
            return Err(StageError::MissingArtifact {
                stage: invocation.stage(),
                target: invocation.target(),
                path: missing.to_path_buf(),
            });
        }

        invocation.clear_completion()?;

        let mut command = Command::new(invocation.program());
        command.args(invocation.args());
        let redirect = invocation.stdout().map(|path| (path, partial_path(path)));
        if let Some((_, partial)) = &redirect {
            let file = File::create(partial).map_err(|source| StageError::Io {
                path: partial.clone(),
                source,
            })?;
            command.stdout(Stdio::from(file));
        }

        info!("Running {}", invocation.command_line());
        let status = command.status().map_err(|source| StageError::Spawn {
            program: invocation.program().display().to_string(),
            source,
        })?;

        drop(command);

        if !status.success() {
            return Err(StageError::Failed {
                stage: invocation.stage(),
                target: invocation.target(),
                status,
            });
        }

        if let Some((path, partial)) = redirect {
            fs::rename(&partial, path).map_err(|source| StageError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        }
        invocation.mark_complete()
    }
}

/// `streamout1.txt` -> `streamout1.txt.partial`
fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".partial");
    PathBuf::from(name)
}

/// Prints each command line instead of running it
pub struct DryRunExecutor;

impl Executor for DryRunExecutor {
    fn execute(&self, invocation: &StageInvocation) -> pipeline::Result<()> {
        println!("{}", invocation.command_line());
        Ok(())
    }
}
