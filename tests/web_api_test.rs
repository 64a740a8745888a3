// Integration tests for the JSON API routes

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{SUNDAY_NOON, analytics_with, ping_at};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use skycount::pings::Ping;
use skycount::web::{AppState, router};
use tower::ServiceExt;

async fn get(pings: Vec<Ping>, uri: &str) -> (StatusCode, Vec<u8>) {
    let (_store, analytics) = analytics_with(pings).await;
    let app = router(AppState { analytics });

    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, body.to_vec())
}

async fn get_json(pings: Vec<Ping>, uri: &str) -> (StatusCode, Value) {
    let (status, body) = get(pings, uri).await;
    (status, serde_json::from_slice(&body).unwrap())
}

fn sample_pings() -> Vec<Ping> {
    let mut pings = Vec::new();
    // KLM1234 flies twice, two hours apart; DLH4AB once
    for (i, offset) in [0, 600, 7_800].into_iter().enumerate() {
        pings.push(ping_at("KLM1234", SUNDAY_NOON + offset, 1.0 + i as f64));
    }
    pings.push(ping_at("DLH4AB", SUNDAY_NOON + 300, 2.0));
    pings
}

#[tokio::test]
async fn test_index_reports_running() {
    let (status, body) = get(Vec::new(), "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(String::from_utf8(body).unwrap(), "skycount flight API is running");
}

#[tokio::test]
async fn test_empty_store_lists_are_empty() {
    for uri in [
        "/data/flights/recent",
        "/data/flights/daily",
        "/data/flights/heatmap",
        "/data/callsigns/top",
        "/data/tracks",
    ] {
        let (status, body) = get_json(Vec::new(), uri).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert_eq!(body, json!({ "data": [] }), "{uri}");
    }
}

#[tokio::test]
async fn test_empty_store_summary_has_null_timestamps() {
    let (status, body) = get_json(Vec::new(), "/data/stats/summary").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "data": {
                "first_ping": null,
                "last_ping": null,
                "total_flights": 0,
                "active_days": 0,
                "median_flights_per_day": 0.0,
                "max_flights_per_day": 0,
                "busiest_day": null
            }
        })
    );
}

#[tokio::test]
async fn test_recent_flights_most_recent_first() {
    let (status, body) = get_json(sample_pings(), "/data/flights/recent").await;
    assert_eq!(status, StatusCode::OK);

    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 3);
    assert_eq!(data[0]["callsign"], "KLM1234");
    assert_eq!(data[0]["ts"], "2025-06-01T14:10:00Z");
    assert_eq!(data[1]["callsign"], "KLM1234");
    assert_eq!(data[1]["ts"], "2025-06-01T12:10:00Z");
    assert_eq!(data[2]["callsign"], "DLH4AB");
    assert_eq!(data[2]["alt_ft"], 1500);
}

#[tokio::test]
async fn test_limit_query_parameter() {
    let (_, body) = get_json(sample_pings(), "/data/flights/recent?limit=1").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    // Zero is raised to the minimum of one
    let (_, body) = get_json(sample_pings(), "/data/callsigns/top?limit=0").await;
    assert_eq!(body["data"], json!([{ "callsign": "KLM1234", "flights": 2 }]));

}

#[tokio::test]
async fn test_malformed_limit_is_json_error() {
    for uri in [
        "/data/tracks?limit=lots",
        "/data/flights/recent?limit=-3",
        "/data/callsigns/top?limit=1.5",
    ] {
        let (status, body) = get_json(sample_pings(), uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert!(body["errors"].as_str().is_some_and(|e| !e.is_empty()), "{uri}");
    }
}

#[tokio::test]
async fn test_daily_and_summary_views() {
    let (_, daily) = get_json(sample_pings(), "/data/flights/daily").await;
    assert_eq!(daily, json!({ "data": [{ "day": "2025-06-01", "flights": 3 }] }));

    let (_, summary) = get_json(sample_pings(), "/data/stats/summary").await;
    let data = &summary["data"];
    assert_eq!(data["first_ping"], "2025-06-01T12:00:00Z");
    assert_eq!(data["last_ping"], "2025-06-01T14:10:00Z");
    assert_eq!(data["total_flights"], 3);
    assert_eq!(data["median_flights_per_day"], 3.0);
    assert_eq!(data["busiest_day"], "2025-06-01");
}

#[tokio::test]
async fn test_tracks_carry_full_paths() {
    let (_, body) = get_json(sample_pings(), "/data/tracks").await;
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 3);

    // KLM1234's first flight is the second most recent and has two points in time order
    let first_flight = &data[1];
    assert_eq!(first_flight["callsign"], "KLM1234");
    assert_eq!(first_flight["sequence"], 0);
    let points = first_flight["points"].as_array().unwrap();
    assert_eq!(points.len(), 2);
    assert_eq!(points[0]["ts"], "2025-06-01T12:00:00Z");
    assert_eq!(points[1]["ts"], "2025-06-01T12:10:00Z");
}

#[tokio::test]
async fn test_metrics_without_recorder_is_unavailable() {
    let (status, _) = get(Vec::new(), "/metrics").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}
