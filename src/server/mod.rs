//! HTTP API over the country store and the refresh pipeline.

pub mod error;
pub mod routes;

use crate::core::config::AppConfig;
use crate::core::refresh::Refresher;
use crate::store::CountryStore;
use anyhow::{Context, Result};
use axum::Router;
use axum::routing::{get, post};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub store: CountryStore,
    pub refresher: Arc<Refresher>,
    pub summary_path: PathBuf,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::root))
        .route("/status", get(routes::status))
        .route("/countries", get(routes::list_countries))
        .route("/countries/refresh", post(routes::refresh_countries))
        .route("/countries/image", get(routes::summary_image))
        .route(
            "/countries/:name",
            get(routes::get_country).delete(routes::delete_country),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Connects the store, wires the pipeline and serves until Ctrl-C.
pub async fn serve(config: &AppConfig) -> Result<()> {
    let store = CountryStore::connect(&config.database_url()?).await?;
    let summary_path = config.summary_image_path()?;
    let refresher = crate::build_refresher(config, store.clone(), &summary_path)?;

    let app = router(AppState {
        store,
        refresher: Arc::new(refresher),
        summary_path,
    });

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "Invalid bind address {}:{}",
                config.server.host, config.server.port
            )
        })?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(%addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await
        .context("Server error")
}
