//! Country and refresh-status records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// A country as produced by one refresh, before it is written to the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryRecord {
    pub name: String,
    pub capital: Option<String>,
    pub region: Option<String>,
    pub population: i64,
    pub currency_code: Option<String>,
    pub exchange_rate: Option<f64>,
    pub estimated_gdp: Option<f64>,
    pub flag_url: Option<String>,
    pub last_refreshed_at: DateTime<Utc>,
}

impl CountryRecord {
    /// Key used for case-insensitive uniqueness and lookups.
    pub fn name_key(&self) -> String {
        name_key(&self.name)
    }
}

/// A persisted country row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Country {
    pub id: i64,
    pub name: String,
    pub capital: Option<String>,
    pub region: Option<String>,
    pub population: i64,
    pub currency_code: Option<String>,
    pub exchange_rate: Option<f64>,
    pub estimated_gdp: Option<f64>,
    pub flag_url: Option<String>,
    pub last_refreshed_at: DateTime<Utc>,
}

/// Summary of the most recent successful refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct RefreshStatus {
    pub total_countries: i64,
    pub last_refreshed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Storage order, i.e. the order countries were first inserted.
    #[default]
    Natural,
    GdpDesc,
}

impl Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                SortOrder::Natural => "natural",
                SortOrder::GdpDesc => "gdp_desc",
            }
        )
    }
}

impl FromStr for SortOrder {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "natural" => Ok(SortOrder::Natural),
            "gdp_desc" => Ok(SortOrder::GdpDesc),
            _ => Err(anyhow::anyhow!("Invalid sort order: {}", s)),
        }
    }
}

/// Filters accepted by the country listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountryFilter {
    pub region: Option<String>,
    pub currency_code: Option<String>,
    pub sort: SortOrder,
}

/// Folds a country name into its lookup key.
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}
