//! Shared fixtures for integration tests
//!
//! Everything here runs against the in-memory ping store and a canned position feed,
//! so no database or network access is needed.

#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use skycount::adsb_feed::{AircraftRecord, PositionFeed};
use skycount::analytics_service::{AnalyticsService, AnalyticsSettings};
use skycount::config::AppConfig;
use skycount::geofence::EARTH_RADIUS_KM;
use skycount::ping_store::{MemoryPingStore, PingStore};
use skycount::pings::Ping;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// 2025-06-01T12:00:00Z, a Sunday
pub const SUNDAY_NOON: i64 = 1_748_779_200;

/// Feed that replays queued responses, then returns empty lists
#[derive(Default)]
pub struct ScriptedFeed {
    responses: Mutex<Vec<Result<Vec<AircraftRecord>, String>>>,
    fetches: AtomicUsize,
}

impl ScriptedFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, records: Vec<AircraftRecord>) {
        self.responses.lock().unwrap().push(Ok(records));
    }

    pub fn push_error(&self, message: &str) {
        self.responses.lock().unwrap().push(Err(message.to_string()));
    }

    /// Number of `fetch` calls so far
    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PositionFeed for ScriptedFeed {
    async fn fetch(&self) -> Result<Vec<AircraftRecord>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Ok(Vec::new());
        }
        responses.remove(0).map_err(anyhow::Error::msg)
    }
}

/// Coordinates `km` north of the default center
pub fn north_of_center(km: f64) -> (f64, f64) {
    let center = AppConfig::default().center();
    (
        center.latitude + (km / EARTH_RADIUS_KM).to_degrees(),
        center.longitude,
    )
}

/// A feed record `km` north of the default center
pub fn record_at(icao: &str, flight: &str, km: f64) -> AircraftRecord {
    let (lat, lon) = north_of_center(km);
    AircraftRecord {
        hex: Some(icao.to_string()),
        flight: Some(flight.to_string()),
        lat: Some(lat),
        lon: Some(lon),
        gs: Some(150.0),
        ..Default::default()
    }
}

/// A stored ping `km` north of the default center
pub fn ping_at(callsign: &str, ts: i64, km: f64) -> Ping {
    let (lat, lon) = north_of_center(km);
    Ping {
        icao: "484506".to_string(),
        callsign: callsign.to_string(),
        ts,
        lat,
        lon,
        alt_ft: Some(1500),
        gs_kts: Some(120.0),
    }
}

/// Analytics with default settings over a fresh in-memory store
pub async fn analytics_with(pings: Vec<Ping>) -> (Arc<MemoryPingStore>, AnalyticsService) {
    let store = Arc::new(MemoryPingStore::new());
    store.append(pings).await.unwrap();
    let service = AnalyticsService::new(
        store.clone(),
        AnalyticsSettings::from(&AppConfig::default()),
    );
    (store, service)
}
