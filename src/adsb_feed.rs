use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::geofence::GeoPoint;
use crate::pings::Ping;

/// adsb.fi open-data v3 API root
pub const FEED_BASE_URL: &str = "https://opendata.adsb.fi/api/v3";

const KM_PER_NAUTICAL_MILE: f64 = 1.852;

/// Whole nautical miles needed to cover `radius_km`, rounded up
pub fn search_radius_nm(radius_km: f64) -> u32 {
    (radius_km / KM_PER_NAUTICAL_MILE).ceil().max(1.0) as u32
}

/// Feed query for every aircraft within `radius_km` of `center`
pub fn feed_url_for(center: GeoPoint, radius_km: f64) -> String {
    format!(
        "{}/lat/{}/lon/{}/dist/{}",
        FEED_BASE_URL,
        center.latitude,
        center.longitude,
        search_radius_nm(radius_km)
    )
}

/// Response body of the position feed
#[derive(Debug, Deserialize)]
pub struct FeedResponse {
    #[serde(default, alias = "aircraft")]
    pub ac: Vec<AircraftRecord>,
}

/// Barometric altitude as reported by the feed: feet, or the literal "ground"
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum BaroAltitude {
    Feet(f64),
    Other(String),
}

impl BaroAltitude {
    pub fn feet(&self) -> Option<i32> {
        match self {
            BaroAltitude::Feet(ft) if ft.is_finite() => Some(ft.round() as i32),
            BaroAltitude::Feet(_) => None,
            BaroAltitude::Other(s) if s.eq_ignore_ascii_case("ground") => Some(0),
            BaroAltitude::Other(_) => None,
        }
    }
}

/// A single aircraft as reported by the feed; every field is optional
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AircraftRecord {
    /// ICAO address as readsb-style feeds name it
    pub hex: Option<String>,
    /// ICAO address under its older key, used when `hex` is absent
    pub icao: Option<String>,
    pub flight: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub alt_baro: Option<BaroAltitude>,
    pub gs: Option<f64>,
}

impl AircraftRecord {
    /// Trimmed ICAO address, preferring `hex` over `icao`
    pub fn address(&self) -> Option<&str> {
        [self.hex.as_deref(), self.icao.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|address| !address.is_empty())
    }

    /// Convert to a ping stamped with the collection time
    ///
    /// Returns `None` when either coordinate is missing. The feed's own timestamps are
    /// ignored: every ping from one poll shares `collected_at`.
    pub fn to_ping(&self, collected_at: i64) -> Option<Ping> {
        let (lat, lon) = (self.lat?, self.lon?);

        Some(Ping {
            icao: self.address().unwrap_or_default().to_string(),
            callsign: self.flight.as_deref().map(str::trim).unwrap_or_default().to_string(),
            ts: collected_at,
            lat,
            lon,
            alt_ft: self.alt_baro.as_ref().and_then(BaroAltitude::feet),
            gs_kts: self.gs.filter(|gs| gs.is_finite()),
        })
    }
}

/// Source of current aircraft positions
#[async_trait]
pub trait PositionFeed: Send + Sync {
    async fn fetch(&self) -> Result<Vec<AircraftRecord>>;
}

/// HTTP client for the adsb.fi open-data feed
pub struct AdsbFeedClient {
    client: Client,
    url: String,
}

impl AdsbFeedClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("skycount/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build feed HTTP client")?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Parse a feed response body
pub fn parse_feed(body: &str) -> Result<Vec<AircraftRecord>> {
    let response: FeedResponse = serde_json::from_str(body).with_context(|| {
        format!(
            "Failed to parse feed response: {}",
            body.chars().take(500).collect::<String>()
        )
    })?;
    Ok(response.ac)
}

#[async_trait]
impl PositionFeed for AdsbFeedClient {
    async fn fetch(&self) -> Result<Vec<AircraftRecord>> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .context("Failed to send request to position feed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "Position feed error {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            );
        }

        let body = response
            .text()
            .await
            .context("Failed to read feed response body")?;

        let records = parse_feed(&body)?;
        debug!("Feed returned {} aircraft", records.len());
        Ok(records)
    }
}
