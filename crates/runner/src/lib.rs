//! Runner crate for stacked cross-validation.
//!
//! This crate contains the orchestrator that sequences the pipeline stages,
//! the executors that actually launch (or print) stage commands, and the
//! confirmation gate consulted before the meta-learner runs.

pub mod error;
pub mod executor;
pub mod gate;
pub mod orchestrator;

pub use error::RunError;
pub use executor::{DryRunExecutor, Executor, ProcessExecutor};
pub use gate::{AutoProceed, Gate, StdinPrompt};
pub use orchestrator::{PipelineOrchestrator, RunOutcome};
