use axum::{
    extract::{Query, State, rejection::QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;

use crate::actions::{DataListResponse, DataResponse, json_error};
use crate::web::AppState;

/// Upper bound for caller-supplied limits
pub const MAX_LIMIT: usize = 500;

// ============================================================================
// Query Parameters
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct LimitParams {
    pub limit: Option<usize>,
}

/// Clamped `limit`, or a JSON 400 for an unparseable query string
fn limit_from(
    query: Result<Query<LimitParams>, QueryRejection>,
) -> Result<Option<usize>, Response> {
    match query {
        Ok(Query(params)) => Ok(params.clamped()),
        Err(rejection) => Err(json_error(rejection.status(), &rejection.body_text())),
    }
}

impl LimitParams {
    /// Requested limit clamped to `1..=MAX_LIMIT`; `None` selects the configured default
    pub fn clamped(&self) -> Option<usize> {
        self.limit.map(|l| l.clamp(1, MAX_LIMIT))
    }
}

// ============================================================================
// Handler Functions
// ============================================================================

/// GET /data/flights/recent
/// Most recently seen flights inside the statistics radius
pub async fn get_recent_flights(
    State(state): State<AppState>,
    query: Result<Query<LimitParams>, QueryRejection>,
) -> impl IntoResponse {
    metrics::counter!("analytics.api.recent_flights.requests_total").increment(1);
    let limit = match limit_from(query) {
        Ok(limit) => limit,
        Err(response) => return response,
    };

    match state.analytics.recent_flights(limit).await {
        Ok(data) => (StatusCode::OK, Json(DataListResponse { data })).into_response(),
        Err(e) => server_error("Failed to get recent flights", e),
    }
}

/// GET /data/flights/daily
/// Flights per UTC day, ascending
pub async fn get_daily_counts(State(state): State<AppState>) -> impl IntoResponse {
    metrics::counter!("analytics.api.daily_counts.requests_total").increment(1);

    match state.analytics.daily_counts().await {
        Ok(data) => (StatusCode::OK, Json(DataListResponse { data })).into_response(),
        Err(e) => server_error("Failed to get daily counts", e),
    }
}

/// GET /data/stats/summary
pub async fn get_summary(State(state): State<AppState>) -> impl IntoResponse {
    metrics::counter!("analytics.api.summary.requests_total").increment(1);

    match state.analytics.summary().await {
        Ok(data) => (StatusCode::OK, Json(DataResponse { data })).into_response(),
        Err(e) => server_error("Failed to get summary statistics", e),
    }
}

/// GET /data/flights/heatmap
/// Flights by UTC weekday (Sunday = 0) and hour
pub async fn get_hourly_heatmap(State(state): State<AppState>) -> impl IntoResponse {
    metrics::counter!("analytics.api.heatmap.requests_total").increment(1);

    match state.analytics.hourly_heatmap().await {
        Ok(data) => (StatusCode::OK, Json(DataListResponse { data })).into_response(),
        Err(e) => server_error("Failed to get hourly heatmap", e),
    }
}

/// GET /data/callsigns/top
pub async fn get_top_callsigns(
    State(state): State<AppState>,
    query: Result<Query<LimitParams>, QueryRejection>,
) -> impl IntoResponse {
    metrics::counter!("analytics.api.top_callsigns.requests_total").increment(1);
    let limit = match limit_from(query) {
        Ok(limit) => limit,
        Err(response) => return response,
    };

    match state.analytics.top_callsigns(limit).await {
        Ok(data) => (StatusCode::OK, Json(DataListResponse { data })).into_response(),
        Err(e) => server_error("Failed to get top callsigns", e),
    }
}

/// GET /data/tracks
/// Full paths of the most recent flights inside the track radius
pub async fn get_tracks(
    State(state): State<AppState>,
    query: Result<Query<LimitParams>, QueryRejection>,
) -> impl IntoResponse {
    metrics::counter!("analytics.api.tracks.requests_total").increment(1);
    let limit = match limit_from(query) {
        Ok(limit) => limit,
        Err(response) => return response,
    };

    match state.analytics.tracks(limit).await {
        Ok(data) => (StatusCode::OK, Json(DataListResponse { data })).into_response(),
        Err(e) => server_error("Failed to get tracks", e),
    }
}

fn server_error(context: &str, e: anyhow::Error) -> Response {
    metrics::counter!("analytics.api.errors_total").increment(1);
    tracing::error!("{}: {:#}", context, e);
    json_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        &format!("{}: {}", context, e),
    )
}
