//! Errors raised by the orchestrator itself (as opposed to a stage).

use experiment::StageKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunError {
    /// The confirmation gate said no
    #[error("the {stage} stage was not confirmed; stopping before it starts")]
    Declined { stage: StageKind },
}
