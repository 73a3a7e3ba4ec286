use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::MalformedElement;
use crate::outcome::{classify, OutcomeCode};
use crate::scraper::extract::parse_price;

/// One (label, price) pair read off a bookmaker page, before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawQuote {
    pub bookmaker: String,
    pub outcome_label: String,
    pub price_text: String,
}

impl RawQuote {
    pub fn to_result(&self) -> Result<OddsResult, MalformedElement> {
        let odds = parse_price(&self.price_text)?;
        OddsResult::new(classify(&self.outcome_label), odds)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OddsResult {
    pub outcome: OutcomeCode,
    pub odds: Decimal,
}

impl OddsResult {
    /// Decimal odds at or below 1.0 cannot pay out and are rejected.
    pub fn new(outcome: OutcomeCode, odds: Decimal) -> Result<Self, MalformedElement> {
        if odds <= Decimal::ONE {
            return Err(MalformedElement::OddsOutOfRange(odds));
        }
        Ok(Self { outcome, odds })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScrapeSuccess {
    pub bookmaker: String,
    pub results: Vec<OddsResult>,
    pub skipped_rows: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScrapeFailure {
    pub bookmaker: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrapeOutcome {
    Success(ScrapeSuccess),
    Failure(ScrapeFailure),
}

impl ScrapeOutcome {
    pub fn bookmaker(&self) -> &str {
        match self {
            ScrapeOutcome::Success(s) => &s.bookmaker,
            ScrapeOutcome::Failure(f) => &f.bookmaker,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsensusRow {
    pub timestamp: DateTime<Utc>,
    pub outcome: OutcomeCode,
    pub fair_probability: Decimal,
    pub averaged_odds: Decimal,
    pub bookmaker_count: usize,
}

/// All consensus rows of one aggregation run.
#[derive(Debug, Clone, Serialize)]
pub struct ConsensusRun {
    pub run_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub rows: Vec<ConsensusRow>,
    /// Bookmakers left out because their odds vector could not be normalized.
    pub excluded: Vec<ScrapeFailure>,
}

impl ConsensusRun {
    pub fn probability_total(&self) -> Decimal {
        self.rows.iter().map(|r| r.fair_probability).sum()
    }
}

#[cfg(test)]
impl ConsensusRun {
    pub fn row(&self, outcome: OutcomeCode) -> Option<&ConsensusRow> {
        self.rows.iter().find(|r| r.outcome == outcome)
    }
}
