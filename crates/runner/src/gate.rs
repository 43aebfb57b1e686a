//! One-shot confirmation before a stage starts.
//!
//! The orchestrator consults its gate at most once, right before the first
//! invocation of the gated stage is run.

use anyhow::Result;
use experiment::StageKind;
use std::io::{self, BufRead, Write};

/// Decides whether the pipeline may enter `stage`
pub trait Gate: Send + Sync {
    fn confirm(&self, stage: StageKind) -> Result<bool>;
}

/// Always proceeds
pub struct AutoProceed;

impl Gate for AutoProceed {
    fn confirm(&self, _stage: StageKind) -> Result<bool> {
        Ok(true)
    }
}

/// Asks the operator on the terminal. End of input counts as "no".
pub struct StdinPrompt;

impl Gate for StdinPrompt {
    fn confirm(&self, stage: StageKind) -> Result<bool> {
        print!("Ready to run the {stage} stage. Continue? [Y/n] ");
        io::stdout().flush()?;

        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer)? == 0 {
            return Ok(false);
        }
        Ok(is_affirmative(&answer))
    }
}

fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "" | "y" | "yes")
}
