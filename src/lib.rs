//! skycount - flight segmentation and aggregation for a fixed area of interest
//!
//! A collector polls an ADS-B position feed, keeps the reports inside a radius around a
//! center point and appends them to a ping store. Flights, counts and tracks are derived
//! from the stored pings on every request and served over a small JSON API.

pub mod actions;
pub mod adsb_feed;
pub mod analytics;
pub mod analytics_service;
pub mod collector;
pub mod config;
pub mod db;
pub mod flights;
pub mod geofence;
pub mod instance_lock;
pub mod log_format;
pub mod metrics;
pub mod ping_store;
pub mod pings;
pub mod pings_repo;
pub mod schema;
pub mod web;

pub use adsb_feed::{AdsbFeedClient, AircraftRecord, PositionFeed};
pub use analytics_service::{AnalyticsService, AnalyticsSettings};
pub use collector::{Collector, CycleReport};
pub use config::AppConfig;
pub use flights::{Flight, segment, segment_by_callsign};
pub use geofence::{GeoPoint, RadiusPolicy, haversine_km};
pub use ping_store::{MemoryPingStore, PingStore};
pub use pings::Ping;
