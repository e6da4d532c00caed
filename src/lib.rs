pub mod cli;
pub mod core;
pub mod providers;
pub mod render;
pub mod server;
pub mod store;

use crate::core::config::AppConfig;
use crate::core::refresh::Refresher;
use crate::providers::{ExchangeRateProvider, RestCountriesProvider};
use crate::render::PngSummaryRenderer;
use crate::store::CountryStore;
use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

pub enum AppCommand {
    Serve,
    Refresh,
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("cgdp starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_with_env(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    match command {
        AppCommand::Serve => server::serve(&config).await,
        AppCommand::Refresh => {
            let store = CountryStore::connect(&config.database_url()?).await?;
            let summary_path = config.summary_image_path()?;
            let refresher = build_refresher(&config, store, &summary_path)?;
            cli::refresh::run(&refresher, &summary_path).await
        }
    }
}

/// Wires the live upstream clients and the PNG renderer into a pipeline.
pub fn build_refresher(
    config: &AppConfig,
    store: CountryStore,
    summary_path: &Path,
) -> Result<Refresher> {
    let timeout = config.request_timeout();
    let countries = RestCountriesProvider::new(&config.providers.countries.base_url, timeout)?;
    let rates = ExchangeRateProvider::new(
        &config.providers.exchange_rates.base_url,
        &config.providers.exchange_rates.base_currency,
        timeout,
    )?;

    Ok(
        Refresher::new(Arc::new(countries), Arc::new(rates), store)
            .with_renderer(Arc::new(PngSummaryRenderer::new(summary_path))),
    )
}
