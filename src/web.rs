use anyhow::{Context, Result};
use axum::{
    Router,
    extract::{MatchedPath, Request},
    middleware::{self, Next},
    response::Response,
    routing::get,
};
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tracing::{Instrument, error, info, info_span};
use uuid::Uuid;

use crate::actions;
use crate::analytics_service::AnalyticsService;

/// State shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub analytics: AnalyticsService,
}

async fn index() -> &'static str {
    "skycount flight API is running"
}

/// Log each request under a short correlation id, time it, and report 5xx to Sentry
async fn observe_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    // Label metrics by route template so query strings cannot blow up cardinality
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let request_id = Uuid::new_v4().simple().to_string()[..8].to_string();
    let span = info_span!("request", id = %request_id);

    let start = Instant::now();
    let response = next.run(request).instrument(span.clone()).await;
    let elapsed = start.elapsed();
    let status = response.status();

    metrics::histogram!(
        "http_request_duration_seconds",
        "route" => route,
        "status" => status.as_u16().to_string()
    )
    .record(elapsed.as_secs_f64());

    let _entered = span.enter();
    info!(
        "{} {} {} in {:.2}ms",
        method,
        uri.path(),
        status.as_u16(),
        elapsed.as_secs_f64() * 1000.0
    );

    if status.is_server_error() {
        error!("HTTP {} on {} {}", status.as_u16(), method, uri);
        sentry::with_scope(
            |scope| {
                scope.set_tag("http.method", method.as_str());
                scope.set_tag("http.url", uri.to_string());
                scope.set_tag("http.status_code", status.as_u16().to_string());
                scope.set_tag("request_id", &request_id);
            },
            || {
                sentry::capture_message(
                    &format!("HTTP {} on {} {}", status.as_u16(), method, uri.path()),
                    sentry::Level::Error,
                )
            },
        );
    }

    response
}

/// Routes: the JSON views under `/data`, plus `/` and `/metrics`
pub fn router(state: AppState) -> Router {
    let data = Router::new()
        .route("/flights/recent", get(actions::get_recent_flights))
        .route("/flights/daily", get(actions::get_daily_counts))
        .route("/flights/heatmap", get(actions::get_hourly_heatmap))
        .route("/stats/summary", get(actions::get_summary))
        .route("/callsigns/top", get(actions::get_top_callsigns))
        .route("/tracks", get(actions::get_tracks))
        .with_state(state);

    Router::new()
        .route("/", get(index))
        .route("/metrics", get(crate::metrics::metrics_handler))
        .nest("/data", data)
        .route_layer(middleware::from_fn(observe_request))
        .layer(CorsLayer::permissive())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal (Ctrl+C), stopping web server"),
        Err(e) => error!("Unable to listen for shutdown signal: {}", e),
    }
}

/// Serve the API until Ctrl+C
pub async fn start_web_server(interface: String, port: u16, state: AppState) -> Result<()> {
    let address = format!("{}:{}", interface, port);
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    info!("Web server listening on http://{}", address);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Web server failed")
}
