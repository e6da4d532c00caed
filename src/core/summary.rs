//! Summary artifact abstractions: ranking and GDP formatting shared by renderers.

use crate::core::country::CountryRecord;
use anyhow::Result;
use chrono::{DateTime, Utc};
use num_format::{Locale, ToFormattedString};
use std::cmp::Ordering;

pub const TOP_COUNTRIES: usize = 5;

/// Produces the post-refresh summary artifact.
pub trait SummaryRenderer: Send + Sync {
    fn render(
        &self,
        records: &[CountryRecord],
        total_countries: usize,
        refreshed_at: DateTime<Utc>,
    ) -> Result<()>;
}

/// Highest estimated GDP first; unknown GDP ranks as zero. Ties keep input order.
pub fn top_by_gdp(records: &[CountryRecord], limit: usize) -> Vec<&CountryRecord> {
    let mut ranked: Vec<&CountryRecord> = records.iter().collect();
    ranked.sort_by(|a, b| {
        let a = a.estimated_gdp.unwrap_or(0.0);
        let b = b.estimated_gdp.unwrap_or(0.0);
        b.partial_cmp(&a).unwrap_or(Ordering::Equal)
    });
    ranked.truncate(limit);
    ranked
}

/// Human-readable GDP: thousands separators and at most two fraction digits.
pub fn format_gdp(value: Option<f64>) -> String {
    let Some(value) = value else {
        return "N/A".to_string();
    };

    let cents = (value.abs() * 100.0).round();
    let sign = if value < 0.0 && cents != 0.0 { "-" } else { "" };
    if !cents.is_finite() || cents >= u128::MAX as f64 {
        // Past u128 cents the fraction is noise; print whole units without grouping.
        return format!("{sign}{:.0}", value.abs());
    }

    let cents = cents as u128;
    let whole = (cents / 100).to_formatted_string(&Locale::en);
    let fraction = cents % 100;

    if fraction == 0 {
        format!("{sign}{whole}")
    } else if fraction % 10 == 0 {
        format!("{sign}{whole}.{}", fraction / 10)
    } else {
        format!("{sign}{whole}.{fraction:02}")
    }
}

/// One ranked entry of the summary, e.g. `1. Nigeria — 2,500,000.5`.
pub fn ranked_line(rank: usize, record: &CountryRecord) -> String {
    format!("{rank}. {} — {}", record.name, format_gdp(record.estimated_gdp))
}
