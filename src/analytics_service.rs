use anyhow::Result;
use std::sync::Arc;
use tracing::debug;

use crate::analytics::{
    self, CallsignCount, DailyCount, FlightTrack, HeatmapCell, RecentFlight, SummaryStats,
};
use crate::config::AppConfig;
use crate::flights::{Flight, segment_by_callsign};
use crate::geofence::RadiusPolicy;
use crate::ping_store::PingStore;

/// Settings the derived views depend on
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalyticsSettings {
    pub statistics: RadiusPolicy,
    pub track: RadiusPolicy,
    pub gap_seconds: i64,
    pub recent_limit: usize,
    pub top_callsigns_limit: usize,
    pub track_limit: usize,
}

impl From<&AppConfig> for AnalyticsSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            statistics: config.statistics_policy(),
            track: config.track_policy(),
            gap_seconds: config.segmentation.gap_seconds,
            recent_limit: config.limits.recent,
            top_callsigns_limit: config.limits.top_callsigns,
            track_limit: config.limits.tracks,
        }
    }
}

/// Computes every view fresh from the ping store
///
/// Holds no mutable state, so concurrent requests never share intermediate results and
/// repeated calls over an unchanged store return identical output.
#[derive(Clone)]
pub struct AnalyticsService {
    store: Arc<dyn PingStore>,
    settings: AnalyticsSettings,
}

impl AnalyticsService {
    pub fn new(store: Arc<dyn PingStore>, settings: AnalyticsSettings) -> Self {
        Self { store, settings }
    }

    /// Segment the pings that pass `policy`
    async fn flights_within(&self, policy: &RadiusPolicy) -> Result<Vec<Flight>> {
        let pings = self.store.pings_for_callsigns().await?;
        let total = pings.len();
        let inside = pings.into_iter().filter(|p| policy.contains(p.point()));
        let flights = segment_by_callsign(inside, self.settings.gap_seconds);
        debug!(
            "Segmented {} pings into {} flights within {} km",
            total,
            flights.len(),
            policy.radius_km
        );
        Ok(flights)
    }

    /// Flights counted for statistics (bubble radius)
    pub async fn statistics_flights(&self) -> Result<Vec<Flight>> {
        self.flights_within(&self.settings.statistics).await
    }

    /// Flights used for path rendering (track radius)
    pub async fn track_flights(&self) -> Result<Vec<Flight>> {
        self.flights_within(&self.settings.track).await
    }

    pub async fn recent_flights(&self, limit: Option<usize>) -> Result<Vec<RecentFlight>> {
        let flights = self.statistics_flights().await?;
        Ok(analytics::recent_flights(
            &flights,
            limit.unwrap_or(self.settings.recent_limit),
        ))
    }

    pub async fn daily_counts(&self) -> Result<Vec<DailyCount>> {
        let flights = self.statistics_flights().await?;
        Ok(analytics::daily_counts(&flights))
    }

    pub async fn summary(&self) -> Result<SummaryStats> {
        let bounds = self.store.time_bounds().await?;
        let flights = self.statistics_flights().await?;
        Ok(analytics::summary(bounds, &flights))
    }

    pub async fn hourly_heatmap(&self) -> Result<Vec<HeatmapCell>> {
        let flights = self.statistics_flights().await?;
        Ok(analytics::hourly_heatmap(&flights))
    }

    pub async fn top_callsigns(&self, limit: Option<usize>) -> Result<Vec<CallsignCount>> {
        let flights = self.statistics_flights().await?;
        Ok(analytics::top_callsigns(
            &flights,
            limit.unwrap_or(self.settings.top_callsigns_limit),
        ))
    }

    pub async fn tracks(&self, limit: Option<usize>) -> Result<Vec<FlightTrack>> {
        let flights = self.track_flights().await?;
        Ok(analytics::tracks(
            &flights,
            limit.unwrap_or(self.settings.track_limit),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geofence::{EARTH_RADIUS_KM, GeoPoint};
    use crate::ping_store::MemoryPingStore;
    use crate::pings::Ping;

    const T0: i64 = 1_748_779_200;

    fn settings() -> AnalyticsSettings {
        AnalyticsSettings::from(&AppConfig::default())
    }

    /// A ping `km` north of the default center
    fn ping_at(callsign: &str, ts: i64, km: f64) -> Ping {
        let center = AppConfig::default().center();
        Ping {
            icao: "484506".to_string(),
            callsign: callsign.to_string(),
            ts,
            lat: center.latitude + (km / EARTH_RADIUS_KM).to_degrees(),
            lon: center.longitude,
            alt_ft: Some(2000),
            gs_kts: Some(140.0),
        }
    }

    async fn service_with(pings: Vec<Ping>) -> AnalyticsService {
        let store = Arc::new(MemoryPingStore::new());
        store.append(pings).await.unwrap();
        AnalyticsService::new(store, settings())
    }

    #[tokio::test]
    async fn test_empty_store_views() {
        let service = service_with(Vec::new()).await;
        assert!(service.recent_flights(None).await.unwrap().is_empty());
        assert!(service.daily_counts().await.unwrap().is_empty());
        assert!(service.hourly_heatmap().await.unwrap().is_empty());
        assert!(service.top_callsigns(None).await.unwrap().is_empty());
        assert!(service.tracks(None).await.unwrap().is_empty());

        let summary = service.summary().await.unwrap();
        assert_eq!(summary.first_ping, None);
        assert_eq!(summary.last_ping, None);
        assert_eq!(summary.total_flights, 0);
        assert_eq!(summary.median_flights_per_day, 0.0);
    }

    #[tokio::test]
    async fn test_statistics_and_track_radii_are_independent() {
        // EDGE only passes through the 5-7.5 km ring: tracked but never counted
        let service = service_with(vec![
            ping_at("CORE", T0, 1.0),
            ping_at("CORE", T0 + 60, 6.0),
            ping_at("EDGE", T0 + 30, 6.5),
            ping_at("EDGE", T0 + 90, 7.0),
        ])
        .await;

        let top = service.top_callsigns(None).await.unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].callsign, "CORE");

        // Statistics see only CORE's in-bubble ping, so its last ping is T0
        let recent = service.recent_flights(None).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].ts, crate::pings::iso8601(T0));

        // Tracks include the out-of-bubble points and the EDGE flight
        let tracks = service.tracks(None).await.unwrap();
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].callsign, "EDGE");
        assert_eq!(tracks[1].callsign, "CORE");
        assert_eq!(tracks[1].points.len(), 2);
    }

    #[tokio::test]
    async fn test_summary_bounds_ignore_radius_and_callsign() {
        let service = service_with(vec![
            ping_at("", T0 - 100, 0.5),
            ping_at("CORE", T0, 1.0),
            ping_at("EDGE", T0 + 500, 7.0),
        ])
        .await;

        let summary = service.summary().await.unwrap();
        assert_eq!(summary.first_ping, Some(crate::pings::iso8601(T0 - 100)));
        assert_eq!(summary.last_ping, Some(crate::pings::iso8601(T0 + 500)));
        assert_eq!(summary.total_flights, 1);
    }

    #[tokio::test]
    async fn test_views_are_idempotent() {
        let service = service_with(vec![
            ping_at("KLM11", T0, 1.0),
            ping_at("KLM11", T0 + 7200, 1.0),
            ping_at("EZY22", T0 + 100, 2.0),
        ])
        .await;

        assert_eq!(
            service.summary().await.unwrap(),
            service.summary().await.unwrap()
        );
        assert_eq!(
            service.tracks(None).await.unwrap(),
            service.tracks(None).await.unwrap()
        );
        assert_eq!(
            service.top_callsigns(None).await.unwrap(),
            service.top_callsigns(None).await.unwrap()
        );

        let top = service.top_callsigns(None).await.unwrap();
        assert_eq!(top[0].callsign, "KLM11");
        assert_eq!(top[0].flights, 2);
    }

    #[tokio::test]
    async fn test_explicit_limit_overrides_default() {
        let pings = (0..15)
            .map(|i| ping_at(&format!("FL{i:02}"), T0 + i, 1.0))
            .collect();
        let service = service_with(pings).await;
        assert_eq!(service.recent_flights(None).await.unwrap().len(), 10);
        assert_eq!(service.recent_flights(Some(3)).await.unwrap().len(), 3);
        assert_eq!(service.tracks(Some(12)).await.unwrap().len(), 12);
    }

    #[test]
    fn test_settings_from_config() {
        let s = settings();
        assert_eq!(s.statistics.center, GeoPoint::new(51.9851, 5.8987));
        assert_eq!(s.gap_seconds, 3600);
        assert_eq!(s.track_limit, 10);
    }
}
