use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use super::calculator::{
    calculate_overround, odds_to_fair_probability, round_half_up, PROBABILITY_DP,
};
use crate::error::OddsError;
use crate::outcome::OutcomeCode;
use crate::types::{ConsensusRow, ConsensusRun, ScrapeFailure, ScrapeSuccess};

pub const ODDS_DP: u32 = 2;
const MAX_ODDS_DP: u32 = 28;
pub const TOTAL_TOLERANCE: Decimal = dec!(0.001);

/// One bookmaker's fair probability for an outcome, with the odds it was derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FairQuote {
    pub outcome: OutcomeCode,
    pub probability: Decimal,
    pub odds: Decimal,
}

/// A bookmaker's de-vigged book, at most one quote per outcome.
#[derive(Debug, Clone)]
pub struct BookmakerFairOdds {
    pub bookmaker: String,
    pub quotes: Vec<FairQuote>,
    pub overround: Decimal,
}

impl BookmakerFairOdds {
    /// Normalizes the bookmaker's full result vector, then folds rows that
    /// classified to the same outcome into one quote.
    pub fn from_success(success: &ScrapeSuccess) -> Result<Self, OddsError> {
        let odds: Vec<Decimal> = success.results.iter().map(|r| r.odds).collect();
        let fair = odds_to_fair_probability(&odds)?;
        let overround = calculate_overround(&odds)?;

        let mut merged: BTreeMap<OutcomeCode, Vec<(Decimal, Decimal)>> = BTreeMap::new();
        for (result, probability) in success.results.iter().zip(fair) {
            merged
                .entry(result.outcome)
                .or_default()
                .push((probability, result.odds));
        }

        let mut quotes = Vec::with_capacity(merged.len());
        for (outcome, rows) in merged {
            let probability: Decimal = rows.iter().map(|(p, _)| *p).sum();
            // shortest price among the merged selections
            let odds = rows
                .iter()
                .map(|(_, o)| *o)
                .min()
                .ok_or(OddsError::ZeroTotal)?;
            quotes.push(FairQuote {
                outcome,
                probability: round_half_up(probability, PROBABILITY_DP),
                odds,
            });
        }

        Ok(Self {
            bookmaker: success.bookmaker.clone(),
            quotes,
            overround,
        })
    }
}

/// Half-up to `ODDS_DP` places, widened when that would collapse a price
/// above 1 onto 1.00 or below.
fn round_odds(value: Decimal) -> Decimal {
    let mut dp = ODDS_DP;
    let mut rounded = round_half_up(value, dp);
    while rounded <= Decimal::ONE && value > Decimal::ONE && dp < MAX_ODDS_DP {
        dp += 1;
        rounded = round_half_up(value, dp);
    }
    rounded
}

#[derive(Default)]
struct Tally {
    probability_sum: Decimal,
    odds_sum: Decimal,
    bookmakers: usize,
}

/// Means across the bookmakers that quoted each outcome. Silent bookmakers
/// are left out of that outcome's average; outcomes nobody quoted get no row.
pub fn aggregate(timestamp: DateTime<Utc>, books: &[BookmakerFairOdds]) -> Vec<ConsensusRow> {
    let mut tallies: BTreeMap<OutcomeCode, Tally> = BTreeMap::new();
    for book in books {
        for q in &book.quotes {
            let t = tallies.entry(q.outcome).or_default();
            t.probability_sum += q.probability;
            t.odds_sum += q.odds;
            t.bookmakers += 1;
        }
    }

    tallies
        .into_iter()
        .filter(|(_, t)| t.bookmakers > 0)
        .map(|(outcome, t)| {
            let n = Decimal::from(t.bookmakers);
            ConsensusRow {
                timestamp,
                outcome,
                fair_probability: round_half_up(t.probability_sum / n, PROBABILITY_DP),
                averaged_odds: round_odds(t.odds_sum / n),
                bookmaker_count: t.bookmakers,
            }
        })
        .collect()
}

/// Normalizes every successful bookmaker and folds them into one consensus run.
pub fn build_consensus(timestamp: DateTime<Utc>, successes: &[ScrapeSuccess]) -> ConsensusRun {
    let mut books = Vec::with_capacity(successes.len());
    let mut excluded = vec![];

    for s in successes {
        match BookmakerFairOdds::from_success(s) {
            Ok(book) => {
                tracing::debug!(
                    bookmaker = %book.bookmaker,
                    overround = %book.overround,
                    outcomes = book.quotes.len(),
                    "bookmaker normalized"
                );
                books.push(book);
            }
            Err(e) => {
                tracing::warn!(bookmaker = %s.bookmaker, error = %e, "excluded from consensus");
                excluded.push(ScrapeFailure {
                    bookmaker: s.bookmaker.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    let run = ConsensusRun {
        run_id: Uuid::new_v4(),
        timestamp,
        rows: aggregate(timestamp, &books),
        excluded,
    };

    let total = run.probability_total();
    if !run.rows.is_empty() && (total - Decimal::ONE).abs() > TOTAL_TOLERANCE {
        tracing::warn!(
            run_id = %run.run_id,
            total = %total,
            "consensus probabilities do not sum to 1; some bookmakers quoted a partial outcome set"
        );
    }
    run
}
