//! Estimated GDP derivation.
//!
//! The estimate is a proxy metric: `population × multiplier ÷ exchange_rate`, where the
//! multiplier is drawn per country from `[MIN_MULTIPLIER, MAX_MULTIPLIER]`.

use rand::Rng;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};

pub const MIN_MULTIPLIER: u32 = 1000;
pub const MAX_MULTIPLIER: u32 = 2000;

/// Source of GDP multipliers. Called once per estimated country.
pub trait MultiplierSource: Send + Sync {
    fn next_multiplier(&self) -> u32;
}

/// Draws multipliers uniformly from the thread-local RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomMultiplier;

impl MultiplierSource for RandomMultiplier {
    fn next_multiplier(&self) -> u32 {
        rand::rng().random_range(MIN_MULTIPLIER..=MAX_MULTIPLIER)
    }
}

/// Unrounded estimate, or `None` when the rate cannot be used as a divisor.
pub fn estimate_gdp(
    population: i64,
    exchange_rate: Option<f64>,
    source: &dyn MultiplierSource,
) -> Option<f64> {
    let rate = exchange_rate.filter(|r| r.is_finite() && *r > 0.0)?;
    let multiplier = source.next_multiplier();
    Some(population as f64 * f64::from(multiplier) / rate)
}

/// Rounds to two decimal places, half away from zero. `None` only for non-finite input.
pub fn round_gdp(value: f64) -> Option<f64> {
    if !value.is_finite() {
        return None;
    }
    let rounded = Decimal::from_f64(value)
        .map(|d| d.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|d| d.to_f64());
    // Outside Decimal's range: large magnitudes carry no fraction bits anyway.
    Some(rounded.unwrap_or_else(|| {
        if value.abs() >= 1e15 {
            value
        } else {
            (value * 100.0).round() / 100.0
        }
    }))
}

/// Applies the persisted GDP rule: no currency means exactly zero, a currency
/// without a usable rate means unknown, anything else is the rounded estimate.
pub fn derive_estimated_gdp(
    currency_code: Option<&str>,
    exchange_rate: Option<f64>,
    population: i64,
    source: &dyn MultiplierSource,
) -> Option<f64> {
    if currency_code.is_none() {
        return Some(0.0);
    }
    estimate_gdp(population, exchange_rate, source).and_then(round_gdp)
}
