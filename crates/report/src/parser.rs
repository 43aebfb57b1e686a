//! Parser for the meta-learner's prediction listing.
//!
//! With `-p 1` the regression prints one row per test instance:
//!
//! ```text
//! === Predictions on test data ===
//!
//!  inst#     actual  predicted      error (user)
//!      1      4          3.712     -0.288 (1)
//!      2      ?          2.950      ?     (7)
//! ```
//!
//! Rows start with the instance number. Anything else (banners, the column
//! header, blank lines, trailing statistics) is skipped. A `?` means the value
//! is missing.

use crate::error::{ReportError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// One prediction row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub instance: u64,
    pub actual: Option<f64>,
    pub predicted: Option<f64>,
    /// Value of the attribute requested with `-p`, without parentheses
    pub attribute: Option<String>,
}

impl Prediction {
    /// `(actual, predicted)` when both are known
    pub fn scored(&self) -> Option<(f64, f64)> {
        Some((self.actual?, self.predicted?))
    }
}

/// Read and parse a report file
pub fn read_predictions(path: &Path) -> Result<Vec<Prediction>> {
    let text = fs::read_to_string(path).map_err(|source| ReportError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_predictions(&text, path)
}

/// Parse report text; `path` is only used in error messages
pub fn parse_predictions(text: &str, path: &Path) -> Result<Vec<Prediction>> {
    let mut predictions = Vec::new();

    for (index, line) in text.lines().enumerate() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some(instance) = tokens.first().and_then(|t| t.parse::<u64>().ok()) else {
            continue;
        };

        let malformed = |reason: String| ReportError::MalformedRow {
            path: path.to_path_buf(),
            line: index + 1,
            reason,
        };

        if tokens.len() < 3 {
            return Err(malformed(format!("expected at least 3 columns, found {}", tokens.len())));
        }
        let actual = parse_value(tokens[1]).map_err(|t| malformed(format!("bad actual value {t:?}")))?;
        let predicted =
            parse_value(tokens[2]).map_err(|t| malformed(format!("bad predicted value {t:?}")))?;

        let attribute = tokens
            .iter()
            .position(|t| t.starts_with('('))
            .map(|start| {
                tokens[start..]
                    .join(" ")
                    .trim_start_matches('(')
                    .trim_end_matches(')')
                    .to_string()
            });

        predictions.push(Prediction {
            instance,
            actual,
            predicted,
            attribute,
        });
    }

    Ok(predictions)
}

fn parse_value(token: &str) -> std::result::Result<Option<f64>, &str> {
    if token == "?" {
        return Ok(None);
    }
    token.parse::<f64>().map(Some).map_err(|_| token)
}
