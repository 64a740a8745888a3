use anyhow::{Context, Result};
use axum::{http::StatusCode, response::IntoResponse};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use tracing::info;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder for this process
///
/// Safe to call more than once; only the first call installs a recorder.
pub fn init_metrics() -> Result<()> {
    if METRICS_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new()
        // Buckets: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s
        .set_buckets_for_metric(
            Matcher::Full("http_request_duration_seconds".to_string()),
            &[
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ],
        )
        .context("failed to set buckets for http_request_duration_seconds")?
        .install_recorder()
        .context("failed to install Prometheus recorder")?;

    let _ = METRICS_HANDLE.set(handle);
    info!("Prometheus metrics recorder installed");
    Ok(())
}

/// GET /metrics
pub async fn metrics_handler() -> impl IntoResponse {
    match METRICS_HANDLE.get() {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "metrics recorder not installed".to_string(),
        ),
    }
}

/// Zero the API counters so they are exported before the first request
pub fn initialize_api_metrics() {
    for view in [
        "recent_flights",
        "daily_counts",
        "summary",
        "heatmap",
        "top_callsigns",
        "tracks",
    ] {
        metrics::counter!(format!("analytics.api.{view}.requests_total")).absolute(0);
    }
    metrics::counter!("analytics.api.errors_total").absolute(0);
}
