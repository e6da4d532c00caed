//! Upstream data abstractions

use anyhow::Result;
use async_trait::async_trait;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;

/// Currency code to rate, relative to the source's base currency.
pub type RateTable = HashMap<String, f64>;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawCurrency {
    pub code: Option<String>,
    pub name: Option<String>,
    pub symbol: Option<String>,
}

/// A country entry exactly as the countries source reports it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawCountry {
    pub name: Option<String>,
    pub capital: Option<String>,
    pub region: Option<String>,
    #[serde(default, deserialize_with = "whole_number")]
    pub population: Option<i64>,
    pub flag: Option<String>,
    pub currencies: Option<Vec<RawCurrency>>,
}

impl RawCountry {
    /// Code of the first listed currency, if the list and its first entry carry one.
    pub fn primary_currency_code(&self) -> Option<&str> {
        self.currencies
            .as_ref()
            .and_then(|currencies| currencies.first())
            .and_then(|currency| currency.code.as_deref())
    }
}

// Counts sometimes arrive as integral floats such as `2500000.0`.
fn whole_number<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Count {
        Int(i64),
        Float(f64),
    }

    match Option::<Count>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Count::Int(n)) => Ok(Some(n)),
        Some(Count::Float(f)) if f.fract() == 0.0 && f.abs() < 9.0e15 => Ok(Some(f as i64)),
        Some(Count::Float(f)) => Err(D::Error::custom(format!("expected a whole number, got {f}"))),
    }
}

#[async_trait]
pub trait CountrySource: Send + Sync {
    async fn fetch_countries(&self) -> Result<Vec<RawCountry>>;
}

#[async_trait]
pub trait RateSource: Send + Sync {
    async fn fetch_rates(&self) -> Result<RateTable>;
}
