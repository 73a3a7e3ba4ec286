//! Party codes and the free-text classifier that maps bookmaker labels onto them.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OutcomeCode {
    #[serde(rename = "ALP")]
    Labor,
    #[serde(rename = "LNP")]
    Coalition,
    #[serde(rename = "OTH")]
    Other,
}

impl OutcomeCode {
    pub fn code(&self) -> &'static str {
        match self {
            OutcomeCode::Labor => "ALP",
            OutcomeCode::Coalition => "LNP",
            OutcomeCode::Other => "OTH",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            OutcomeCode::Labor => "Labor",
            OutcomeCode::Coalition => "Coalition",
            OutcomeCode::Other => "Any other party",
        }
    }
}

impl fmt::Display for OutcomeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// Checked in order; first hit wins. Leader surnames go stale, so keep this list current.
const KEYWORDS: &[(OutcomeCode, &[&str])] = &[
    (OutcomeCode::Labor, &["labor", "alp", "albanese"]),
    (
        OutcomeCode::Coalition,
        &["coalition", "liberal", "lnp", "l/np", "ley", "national"],
    ),
];

/// Best-effort mapping of a bookmaker's outcome label to a party code.
/// Total: anything unrecognised is `Other`.
pub fn classify(label: &str) -> OutcomeCode {
    let label = label.trim().to_lowercase();
    KEYWORDS
        .iter()
        .find(|(_, terms)| terms.iter().any(|t| label.contains(t)))
        .map(|(code, _)| *code)
        .unwrap_or(OutcomeCode::Other)
}
