use super::AppState;
use super::error::{ApiError, ApiResult};
use crate::core::country::{Country, CountryFilter, RefreshStatus};
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub message: &'static str,
    pub database_status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub message: &'static str,
    pub total_countries: i64,
    pub last_refreshed_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub region: Option<String>,
    pub currency: Option<String>,
    pub sort: Option<String>,
}

impl From<ListQuery> for CountryFilter {
    fn from(query: ListQuery) -> Self {
        let non_empty = |value: Option<String>| value.filter(|v| !v.is_empty());
        CountryFilter {
            region: non_empty(query.region),
            currency_code: non_empty(query.currency),
            // Unrecognized sort values fall back to natural order.
            sort: query
                .sort
                .and_then(|s| s.parse().ok())
                .unwrap_or_default(),
        }
    }
}

/// GET /
pub async fn root(State(state): State<AppState>) -> Json<RootResponse> {
    let database_status = match state.store.ping().await {
        Ok(()) => "connected",
        Err(e) => {
            debug!(error = ?e, "Database ping failed");
            "unreachable"
        }
    };
    Json(RootResponse {
        message: "Country GDP estimator API",
        database_status,
    })
}

/// POST /countries/refresh
pub async fn refresh_countries(
    State(state): State<AppState>,
) -> ApiResult<(StatusCode, Json<RefreshResponse>)> {
    let outcome = state.refresher.refresh().await?;
    Ok((
        StatusCode::CREATED,
        Json(RefreshResponse {
            message: "Countries refreshed successfully",
            total_countries: outcome.status.total_countries,
            last_refreshed_at: outcome.status.last_refreshed_at,
        }),
    ))
}

/// GET /countries
pub async fn list_countries(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<Country>>> {
    let filter = CountryFilter::from(query);
    Ok(Json(state.store.list_countries(&filter).await?))
}

/// GET /countries/:name
pub async fn get_country(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<Country>> {
    state
        .store
        .find_country(&name)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("Country not found"))
}

/// DELETE /countries/:name
pub async fn delete_country(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<StatusCode> {
    if state.store.delete_country(&name).await? {
        info!(%name, "Country deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Country not found"))
    }
}

/// GET /status
pub async fn status(State(state): State<AppState>) -> ApiResult<Json<RefreshStatus>> {
    state
        .store
        .status()
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("Status not found"))
}

/// GET /countries/image
pub async fn summary_image(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    match tokio::fs::read(&state.summary_path).await {
        Ok(bytes) => Ok(([(header::CONTENT_TYPE, "image/png")], bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ApiError::NotFound("Summary image not found"))
        }
        Err(e) => Err(ApiError::Internal(anyhow::Error::new(e).context(format!(
            "Failed to read summary image: {}",
            state.summary_path.display()
        )))),
    }
}
