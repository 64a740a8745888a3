use chrono::{DateTime, SecondsFormat, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::geofence::GeoPoint;

/// A single raw position report as stored in the `positions` table
///
/// Pings are immutable once stored and are never deduplicated: identical reports from
/// consecutive polls become distinct rows.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Insertable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::positions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Ping {
    /// Aircraft address (ICAO 24-bit hex), empty if the feed omitted it
    pub icao: String,

    /// Trimmed callsign, empty if the feed omitted it
    pub callsign: String,

    /// Collection time in UTC seconds since the epoch
    pub ts: i64,

    pub lat: f64,
    pub lon: f64,

    /// Barometric altitude in feet
    pub alt_ft: Option<i32>,

    /// Ground speed in knots
    pub gs_kts: Option<f64>,
}

impl Ping {
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lon)
    }

    /// Whether this ping can take part in flight segmentation
    pub fn has_callsign(&self) -> bool {
        !self.callsign.is_empty()
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.ts, 0)
    }
}

/// Render UTC epoch seconds as an ISO-8601 string (`2025-06-01T12:00:00Z`)
///
/// Out-of-range values fall back to the epoch rather than failing a whole response.
pub fn iso8601(ts: i64) -> String {
    DateTime::from_timestamp(ts, 0)
        .unwrap_or(DateTime::UNIX_EPOCH)
        .to_rfc3339_opts(SecondsFormat::Secs, true)
}
