//! Decimal odds to implied and fair (overround-removed) probabilities.
//!
//! All results are rounded to four places, half-up. Because every element of a
//! normalized vector is rounded on its own, the vector may sum to 1 plus or
//! minus a few units in the last place.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::OddsError;

pub const PROBABILITY_DP: u32 = 4;

pub(crate) fn round_half_up(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

/// `1 / odds`, e.g. 2.00 -> 0.5000.
pub fn decimal_to_probability(odds: Decimal) -> Result<Decimal, OddsError> {
    if odds <= Decimal::ZERO {
        return Err(OddsError::InvalidOdds(odds));
    }
    let implied = Decimal::ONE
        .checked_div(odds)
        .ok_or(OddsError::InvalidOdds(odds))?;
    Ok(round_half_up(implied, PROBABILITY_DP))
}

/// Scales each probability by the vector total so the result sums to ~1.
pub fn normalize(probabilities: &[Decimal]) -> Result<Vec<Decimal>, OddsError> {
    if probabilities.is_empty() {
        return Ok(vec![]);
    }
    let total: Decimal = probabilities.iter().sum();
    if total.is_zero() {
        return Err(OddsError::ZeroTotal);
    }
    probabilities
        .iter()
        .map(|p| {
            p.checked_div(total)
                .map(|share| round_half_up(share, PROBABILITY_DP))
                .ok_or(OddsError::ZeroTotal)
        })
        .collect()
}

/// Implied probabilities first, then normalization across the whole vector.
pub fn odds_to_fair_probability(odds: &[Decimal]) -> Result<Vec<Decimal>, OddsError> {
    let implied = odds
        .iter()
        .map(|o| decimal_to_probability(*o))
        .collect::<Result<Vec<_>, _>>()?;
    normalize(&implied)
}

/// Sum of implied probabilities. Above 1.0 is the bookmaker's margin; informational only.
pub fn calculate_overround(odds: &[Decimal]) -> Result<Decimal, OddsError> {
    let mut total = Decimal::ZERO;
    for o in odds {
        total += decimal_to_probability(*o)?;
    }
    Ok(round_half_up(total, PROBABILITY_DP))
}
