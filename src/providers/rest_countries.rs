use super::util::{build_client, get_json};
use crate::core::source::{CountrySource, RawCountry};
use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

const COUNTRIES_PATH: &str = "/v2/all?fields=name,capital,region,population,flag,currencies";

/// Country metadata from a REST Countries (v2) compatible endpoint.
pub struct RestCountriesProvider {
    base_url: String,
    client: reqwest::Client,
}

impl RestCountriesProvider {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(RestCountriesProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: build_client(timeout)?,
        })
    }
}

#[async_trait]
impl CountrySource for RestCountriesProvider {
    #[instrument(name = "CountriesFetch", skip(self), fields(base_url = %self.base_url))]
    async fn fetch_countries(&self) -> Result<Vec<RawCountry>> {
        let url = format!("{}{}", self.base_url, COUNTRIES_PATH);
        let entries: Vec<serde_json::Value> = get_json(&self.client, &url, "countries API").await?;

        // A malformed entry only costs that entry.
        let received = entries.len();
        let countries: Vec<RawCountry> = entries
            .into_iter()
            .enumerate()
            .filter_map(|(index, entry)| match serde_json::from_value(entry) {
                Ok(country) => Some(country),
                Err(e) => {
                    debug!(index, error = %e, "Skipping malformed country entry");
                    None
                }
            })
            .collect();
        debug!(received, count = countries.len(), "Received countries");
        Ok(countries)
    }
}
