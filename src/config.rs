use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::adsb_feed::feed_url_for;
use crate::flights::DEFAULT_GAP_SECONDS;
use crate::geofence::{GeoPoint, RadiusPolicy};

/// Environment variable naming a TOML config file
pub const CONFIG_PATH_ENV: &str = "SKYCOUNT_CONFIG";

/// Area of interest: one center and two independent radii
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AreaConfig {
    pub center_latitude: f64,
    pub center_longitude: f64,
    /// Bubble radius governing flight counts, heatmaps and callsign rankings
    pub statistics_radius_km: f64,
    /// Wider radius governing storage and track rendering
    pub track_radius_km: f64,
}

impl Default for AreaConfig {
    fn default() -> Self {
        Self {
            center_latitude: 51.9851,
            center_longitude: 5.8987,
            statistics_radius_km: 5.0,
            track_radius_km: 7.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Inactivity gap (strictly exceeded) that starts a new flight
    pub gap_seconds: i64,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            gap_seconds: DEFAULT_GAP_SECONDS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub recent: usize,
    pub top_callsigns: usize,
    pub tracks: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            recent: 10,
            top_callsigns: 10,
            tracks: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Explicit feed endpoint; when unset the query is built from the area center and
    /// the track radius
    pub feed_url: Option<String>,
    pub poll_interval_secs: u64,
    pub feed_timeout_secs: u64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            feed_url: None,
            poll_interval_secs: 10,
            feed_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    pub interface: String,
    pub port: u16,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            interface: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

/// Complete runtime configuration
///
/// Built from defaults, then an optional TOML file, then environment overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub area: AreaConfig,
    pub segmentation: SegmentationConfig,
    pub limits: LimitsConfig,
    pub collector: CollectorConfig,
    pub web: WebConfig,
}

impl AppConfig {
    /// Load configuration from `path` (or `SKYCOUNT_CONFIG`) and the process environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path: Option<PathBuf> = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from));

        let mut config = match path {
            Some(path) => {
                let contents = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                info!("Loaded configuration from {}", path.display());
                Self::from_toml_str(&contents)
                    .with_context(|| format!("Invalid config file {}", path.display()))?
            }
            None => Self::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Failed to parse TOML configuration")
    }

    /// Apply `SKYCOUNT_*` overrides from a key lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parse<T: std::str::FromStr>(key: &str, value: String) -> Result<T>
        where
            T::Err: std::error::Error + Send + Sync + 'static,
        {
            value
                .trim()
                .parse::<T>()
                .with_context(|| format!("Invalid value for {key}: {value:?}"))
        }

        if let Some(v) = lookup("SKYCOUNT_STATS_RADIUS_KM") {
            self.area.statistics_radius_km = parse("SKYCOUNT_STATS_RADIUS_KM", v)?;
        }
        if let Some(v) = lookup("SKYCOUNT_TRACK_RADIUS_KM") {
            self.area.track_radius_km = parse("SKYCOUNT_TRACK_RADIUS_KM", v)?;
        }
        if let Some(v) = lookup("SKYCOUNT_GAP_SECONDS") {
            self.segmentation.gap_seconds = parse("SKYCOUNT_GAP_SECONDS", v)?;
        }
        if let Some(v) = lookup("SKYCOUNT_FEED_URL") {
            self.collector.feed_url = Some(v);
        }
        if let Some(v) = lookup("SKYCOUNT_PORT") {
            self.web.port = parse("SKYCOUNT_PORT", v)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let area = &self.area;
        if !(area.center_latitude.is_finite() && (-90.0..=90.0).contains(&area.center_latitude)) {
            anyhow::bail!("center_latitude must be within -90..=90");
        }
        if !(area.center_longitude.is_finite()
            && (-180.0..=180.0).contains(&area.center_longitude))
        {
            anyhow::bail!("center_longitude must be within -180..=180");
        }
        for (name, radius) in [
            ("statistics_radius_km", area.statistics_radius_km),
            ("track_radius_km", area.track_radius_km),
        ] {
            if !(radius.is_finite() && radius > 0.0) {
                anyhow::bail!("{name} must be a positive number, got {radius}");
            }
        }
        if area.track_radius_km < area.statistics_radius_km {
            anyhow::bail!(
                "track_radius_km ({}) must not be smaller than statistics_radius_km ({})",
                area.track_radius_km,
                area.statistics_radius_km
            );
        }
        if self.segmentation.gap_seconds <= 0 {
            anyhow::bail!("gap_seconds must be positive");
        }
        if self.limits.recent == 0 || self.limits.top_callsigns == 0 || self.limits.tracks == 0 {
            anyhow::bail!("limits must be positive");
        }
        if self.collector.poll_interval_secs == 0 || self.collector.feed_timeout_secs == 0 {
            anyhow::bail!("poll_interval_secs and feed_timeout_secs must be positive");
        }
        Ok(())
    }

    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(self.area.center_latitude, self.area.center_longitude)
    }

    pub fn statistics_policy(&self) -> RadiusPolicy {
        RadiusPolicy::new(self.center(), self.area.statistics_radius_km)
    }

    /// The storage radius doubles as the track radius
    pub fn track_policy(&self) -> RadiusPolicy {
        RadiusPolicy::new(self.center(), self.area.track_radius_km)
    }

    /// Feed endpoint covering the whole track radius unless overridden
    pub fn feed_url(&self) -> String {
        match &self.collector.feed_url {
            Some(url) => url.clone(),
            None => feed_url_for(self.center(), self.area.track_radius_km),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.collector.poll_interval_secs)
    }

    pub fn feed_timeout(&self) -> Duration {
        Duration::from_secs(self.collector.feed_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        config.validate().unwrap();
        assert_eq!(config.statistics_policy().radius_km, 5.0);
        assert_eq!(config.track_policy().radius_km, 7.5);
        assert_eq!(config.segmentation.gap_seconds, 3600);
        assert_eq!(config.limits.recent, 10);
        assert_eq!(config.poll_interval(), Duration::from_secs(10));
    }

    #[test]
    fn test_default_feed_query_covers_track_radius() {
        let config = AppConfig::default();
        assert_eq!(
            config.feed_url(),
            "https://opendata.adsb.fi/api/v3/lat/51.9851/lon/5.8987/dist/5"
        );

        let dist_nm: f64 = config
            .feed_url()
            .rsplit('/')
            .next()
            .unwrap()
            .parse()
            .unwrap();
        assert!(dist_nm * 1.852 >= config.area.track_radius_km);
    }

    #[test]
    fn test_feed_query_follows_area() {
        let config = AppConfig::from_toml_str(
            r#"
            [area]
            center_latitude = 52.3086
            center_longitude = 4.7639
            track_radius_km = 20.0
            "#,
        )
        .unwrap();
        assert_eq!(
            config.feed_url(),
            "https://opendata.adsb.fi/api/v3/lat/52.3086/lon/4.7639/dist/11"
        );

        let mut config = AppConfig::default();
        config
            .apply_overrides(|key| {
                (key == "SKYCOUNT_FEED_URL").then(|| "http://localhost:8080/feed".to_string())
            })
            .unwrap();
        assert_eq!(config.feed_url(), "http://localhost:8080/feed");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            [area]
            statistics_radius_km = 7.5
            track_radius_km = 12.0

            [limits]
            tracks = 25
            "#,
        )
        .unwrap();
        assert_eq!(config.area.statistics_radius_km, 7.5);
        assert_eq!(config.area.track_radius_km, 12.0);
        assert_eq!(config.area.center_latitude, 51.9851);
        assert_eq!(config.limits.tracks, 25);
        assert_eq!(config.limits.recent, 10);
        config.validate().unwrap();
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("SKYCOUNT_STATS_RADIUS_KM", "3.5"),
            ("SKYCOUNT_GAP_SECONDS", "1800"),
        ]);
        let mut config = AppConfig::default();
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.area.statistics_radius_km, 3.5);
        assert_eq!(config.segmentation.gap_seconds, 1800);
        assert_eq!(config.area.track_radius_km, 7.5);
    }

    #[test]
    fn test_invalid_override_is_error() {
        let mut config = AppConfig::default();
        let result = config.apply_overrides(|key| {
            (key == "SKYCOUNT_GAP_SECONDS").then(|| "an hour".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_track_radius_smaller_than_bubble_is_rejected() {
        let mut config = AppConfig::default();
        config.area.track_radius_km = 2.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_positive_values_are_rejected() {
        let mut config = AppConfig::default();
        config.segmentation.gap_seconds = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.area.statistics_radius_km = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.limits.top_callsigns = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_load_from_file_and_environment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("skycount.toml");
        std::fs::write(&path, "[segmentation]\ngap_seconds = 900\n").unwrap();

        // SAFETY: serialized with other environment-mutating tests
        unsafe { std::env::set_var("SKYCOUNT_TRACK_RADIUS_KM", "9.0") };
        let config = AppConfig::load(Some(&path));
        unsafe { std::env::remove_var("SKYCOUNT_TRACK_RADIUS_KM") };

        let config = config.unwrap();
        assert_eq!(config.segmentation.gap_seconds, 900);
        assert_eq!(config.area.track_radius_km, 9.0);
    }
}
