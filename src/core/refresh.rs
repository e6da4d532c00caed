//! The refresh pipeline: fetch both upstreams, derive country records, commit
//! them with the status row in one transaction, then render the summary.

use crate::core::country::{CountryRecord, RefreshStatus};
use crate::core::estimator::{MultiplierSource, RandomMultiplier, derive_estimated_gdp};
use crate::core::source::{CountrySource, RateSource, RateTable, RawCountry};
use crate::core::summary::SummaryRenderer;
use crate::store::CountryStore;
use chrono::{DateTime, SubsecRound, Utc};
use futures::future::try_join;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("External data source unavailable: {details}")]
    UpstreamUnavailable { details: String },
    #[error("Failed to persist refreshed countries")]
    Persistence(#[source] anyhow::Error),
}

impl RefreshError {
    fn upstream(details: impl Into<String>) -> Self {
        RefreshError::UpstreamUnavailable {
            details: details.into(),
        }
    }
}

/// Result of a committed refresh.
#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    pub status: RefreshStatus,
    pub records: Vec<CountryRecord>,
    /// Set when the summary could not be rendered; the refresh itself still succeeded.
    pub render_error: Option<String>,
}

pub struct Refresher {
    countries: Arc<dyn CountrySource>,
    rates: Arc<dyn RateSource>,
    store: CountryStore,
    multiplier: Arc<dyn MultiplierSource>,
    renderer: Option<Arc<dyn SummaryRenderer>>,
    in_progress: Mutex<()>,
}

impl Refresher {
    pub fn new(
        countries: Arc<dyn CountrySource>,
        rates: Arc<dyn RateSource>,
        store: CountryStore,
    ) -> Self {
        Refresher {
            countries,
            rates,
            store,
            multiplier: Arc::new(RandomMultiplier),
            renderer: None,
            in_progress: Mutex::new(()),
        }
    }

    pub fn with_multiplier(mut self, multiplier: Arc<dyn MultiplierSource>) -> Self {
        self.multiplier = multiplier;
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn SummaryRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Runs one full refresh. Concurrent callers are served one at a time.
    #[instrument(name = "Refresh", skip(self))]
    pub async fn refresh(&self) -> Result<RefreshOutcome, RefreshError> {
        let _in_progress = self.in_progress.lock().await;

        let (raw_countries, rates) =
            try_join(self.fetch_countries(), self.fetch_rates()).await?;

        if raw_countries.is_empty() {
            error!("Countries API returned no countries");
            return Err(RefreshError::upstream("Invalid countries data"));
        }

        let refreshed_at = Utc::now().trunc_subsecs(3);
        let records = build_records(&raw_countries, &rates, refreshed_at, &*self.multiplier);
        info!(
            fetched = raw_countries.len(),
            kept = records.len(),
            rates = rates.len(),
            "Prepared country records"
        );

        let status = self
            .store
            .replace_countries(&records, refreshed_at)
            .await
            .map_err(|e| {
                error!(error = ?e, "Refresh transaction failed");
                RefreshError::Persistence(e)
            })?;

        let render_error = self.render_summary(&records, refreshed_at).await;

        info!(
            total = status.total_countries,
            at = %status.last_refreshed_at,
            "Countries refreshed"
        );
        Ok(RefreshOutcome {
            status,
            records,
            render_error,
        })
    }

    async fn fetch_countries(&self) -> Result<Vec<RawCountry>, RefreshError> {
        self.countries.fetch_countries().await.map_err(|e| {
            error!(error = ?e, "External API fetch failed");
            RefreshError::upstream("Could not fetch data from countries API")
        })
    }

    async fn fetch_rates(&self) -> Result<RateTable, RefreshError> {
        self.rates.fetch_rates().await.map_err(|e| {
            error!(error = ?e, "External API fetch failed");
            RefreshError::upstream("Could not fetch data from exchange rates API")
        })
    }

    /// Post-commit hook. Failures are logged and returned, never propagated.
    async fn render_summary(
        &self,
        records: &[CountryRecord],
        refreshed_at: DateTime<Utc>,
    ) -> Option<String> {
        let renderer = Arc::clone(self.renderer.as_ref()?);
        let records = records.to_vec();
        let total = records.len();

        let result =
            tokio::task::spawn_blocking(move || renderer.render(&records, total, refreshed_at))
                .await;

        let message = match result {
            Ok(Ok(())) => {
                debug!("Summary image generated");
                return None;
            }
            Ok(Err(e)) => format!("{e:#}"),
            Err(join_error) => format!("Summary renderer panicked: {join_error}"),
        };
        warn!(error = %message, "Image generation failed");
        Some(message)
    }
}

/// Turns raw upstream entries into country records stamped with `refreshed_at`.
///
/// Entries without a name or with a missing or negative population are skipped.
/// Names that collide case-insensitively collapse into one record carrying the
/// last entry's data, in the position (and spelling) of the first.
pub fn build_records(
    raw_countries: &[RawCountry],
    rates: &RateTable,
    refreshed_at: DateTime<Utc>,
    multiplier: &dyn MultiplierSource,
) -> Vec<CountryRecord> {
    let mut records: Vec<CountryRecord> = Vec::with_capacity(raw_countries.len());
    let mut positions: HashMap<String, usize> = HashMap::new();

    for raw in raw_countries {
        let Some(record) = build_record(raw, rates, refreshed_at, multiplier) else {
            debug!(name = ?raw.name, population = ?raw.population, "Skipping invalid country");
            continue;
        };

        match positions.get(&record.name_key()) {
            Some(&index) => {
                debug!(name = %record.name, "Duplicate country name in batch");
                let name = std::mem::take(&mut records[index].name);
                records[index] = CountryRecord { name, ..record };
            }
            None => {
                positions.insert(record.name_key(), records.len());
                records.push(record);
            }
        }
    }

    records
}

fn build_record(
    raw: &RawCountry,
    rates: &RateTable,
    refreshed_at: DateTime<Utc>,
    multiplier: &dyn MultiplierSource,
) -> Option<CountryRecord> {
    let name = raw.name.as_deref().map(str::trim).filter(|n| !n.is_empty())?;
    let population = raw.population.filter(|p| *p >= 0)?;

    let currency_code = raw.primary_currency_code().map(str::to_string);
    let exchange_rate = currency_code
        .as_deref()
        .and_then(|code| rates.get(code))
        .copied()
        .filter(|rate| rate.is_finite() && *rate > 0.0);
    let estimated_gdp =
        derive_estimated_gdp(currency_code.as_deref(), exchange_rate, population, multiplier);

    Some(CountryRecord {
        name: name.to_string(),
        capital: raw.capital.clone(),
        region: raw.region.clone(),
        population,
        currency_code,
        exchange_rate,
        estimated_gdp,
        flag_url: raw.flag.clone(),
        last_refreshed_at: refreshed_at,
    })
}
