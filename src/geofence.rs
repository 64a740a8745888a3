//! Radius geofencing for position reports
//!
//! A radius policy is a fixed center point plus a radius in kilometers. A position is
//! inside the policy when its great-circle (haversine) distance from the center is at
//! most the radius. Two policies coexist: a tight "statistics" bubble that governs what
//! counts as a flight, and a wider "track" radius used for storage and path rendering.

use serde::{Deserialize, Serialize};

/// Mean Earth radius used for all distance calculations
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A latitude/longitude pair in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Great-circle distance between two points in kilometers
///
/// The haversine term is clamped to [0, 1] so rounding near antipodal or coincident
/// points cannot push `sqrt` or `atan2` outside their domain.
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let delta_lat = (b.latitude - a.latitude).to_radians();
    let delta_lon = (b.longitude - a.longitude).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    let h = h.clamp(0.0, 1.0);

    2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}

/// A named inclusion rule: center point and radius
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RadiusPolicy {
    pub center: GeoPoint,
    pub radius_km: f64,
}

impl RadiusPolicy {
    pub fn new(center: GeoPoint, radius_km: f64) -> Self {
        Self { center, radius_km }
    }

    /// Distance from the policy center in kilometers
    pub fn distance_km(&self, point: GeoPoint) -> f64 {
        haversine_km(self.center, point)
    }

    /// True iff the point lies within the radius (boundary inclusive)
    ///
    /// Non-finite coordinates yield a NaN distance and are never contained.
    pub fn contains(&self, point: GeoPoint) -> bool {
        self.distance_km(point) <= self.radius_km
    }

    /// Inclusion test for coordinates that may be missing
    ///
    /// A report without latitude or longitude is excluded, not an error.
    pub fn includes(&self, latitude: Option<f64>, longitude: Option<f64>) -> bool {
        match (latitude, longitude) {
            (Some(lat), Some(lon)) => self.contains(GeoPoint::new(lat, lon)),
            _ => false,
        }
    }
}

/// Free-function form of [`RadiusPolicy::contains`]
pub fn included(point: GeoPoint, policy: &RadiusPolicy) -> bool {
    policy.contains(point)
}
