//! Error types for scraping, odds math and configuration

use rust_decimal::Decimal;
use thiserror::Error;

use crate::scraper::ScrapeStage;

/// Scraper-level failures. Any of these turns a bookmaker's run into a `Failure`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScrapeError {
    #[error("timed out after {timeout_ms}ms while {stage}")]
    NavigationTimeout { stage: ScrapeStage, timeout_ms: u64 },

    #[error("no odds extracted from {candidates} candidate element(s); site layout may have changed")]
    EmptyExtraction { candidates: usize },

    #[error("browser error: {0}")]
    Browser(String),

    #[error("scraper task aborted: {0}")]
    Aborted(String),
}

/// Row-level problems. The offending element is skipped, never escalated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedElement {
    #[error("missing {0} field")]
    MissingField(&'static str),

    #[error("unexpected label format: {0:?}")]
    UnexpectedFormat(String),

    #[error("unparseable price text: {0:?}")]
    UnparseablePrice(String),

    #[error("decimal odds must be above 1.0, got {0}")]
    OddsOutOfRange(Decimal),

    #[error("element unreadable: {0}")]
    Unreadable(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OddsError {
    #[error("invalid odds {0}: must be positive")]
    InvalidOdds(Decimal),

    #[error("total probability cannot be zero")]
    ZeroTotal,
}

/// Fatal for the whole run; raised before any scraping starts.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unknown bookmaker: {filter}. Available: {available}")]
    UnknownBookmaker { filter: String, available: String },

    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),
}
