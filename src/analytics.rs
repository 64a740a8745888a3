//! Derived views over segmented flights
//!
//! Every function here is pure: it takes flights produced by [`crate::flights`] and
//! returns a JSON-serializable view. Empty input always yields empty lists, zero
//! counts and null timestamps.

use chrono::{Datelike, NaiveDate, Timelike};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};

use crate::flights::Flight;
use crate::pings::iso8601;

/// One row of the recent-flights list, taken from the flight's last ping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentFlight {
    pub ts: String,
    pub callsign: String,
    pub gs_kts: Option<f64>,
    pub alt_ft: Option<i32>,
}

/// Number of flights whose last ping fell on a UTC calendar date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyCount {
    pub day: NaiveDate,
    pub flights: usize,
}

/// Dashboard summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    /// Earliest stored ping of any kind (not radius filtered)
    pub first_ping: Option<String>,
    /// Latest stored ping of any kind (not radius filtered)
    pub last_ping: Option<String>,
    pub total_flights: usize,
    pub active_days: usize,
    pub median_flights_per_day: f64,
    pub max_flights_per_day: usize,
    pub busiest_day: Option<NaiveDate>,
}

/// Flights bucketed by UTC weekday (Sunday = 0) and hour of day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatmapCell {
    pub day_of_week: u32,
    pub hour: u32,
    pub flights: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallsignCount {
    pub callsign: String,
    pub flights: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub ts: String,
    pub lat: f64,
    pub lon: f64,
    pub alt_ft: Option<i32>,
}

/// Full path of one flight, points ascending by time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightTrack {
    pub callsign: String,
    pub sequence: u32,
    pub last_seen: String,
    pub points: Vec<TrackPoint>,
}

/// Standard median: mean of the two middle values for an even count, 0 when empty
pub fn median(values: &[usize]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_unstable();

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) as f64 / 2.0
    } else {
        sorted[mid] as f64
    }
}

/// Flights ordered by last-ping recency, most recent first
///
/// Equal timestamps fall back to callsign then sequence so the order is stable across
/// calls.
fn by_recency(flights: &[Flight]) -> Vec<&Flight> {
    let mut ordered: Vec<&Flight> = flights.iter().collect();
    ordered.sort_by(|a, b| {
        b.last_ts()
            .cmp(&a.last_ts())
            .then_with(|| a.callsign.cmp(&b.callsign))
            .then_with(|| a.sequence.cmp(&b.sequence))
    });
    ordered
}

/// The `limit` most recently seen flights
pub fn recent_flights(flights: &[Flight], limit: usize) -> Vec<RecentFlight> {
    by_recency(flights)
        .into_iter()
        .take(limit)
        .map(|flight| {
            let last = flight.last_ping();
            RecentFlight {
                ts: iso8601(last.ts),
                callsign: flight.callsign.clone(),
                gs_kts: last.gs_kts,
                alt_ft: last.alt_ft,
            }
        })
        .collect()
}

/// Flights per UTC date of their last ping, ascending by date
pub fn daily_counts(flights: &[Flight]) -> Vec<DailyCount> {
    let mut counts: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for flight in flights {
        if let Some(when) = flight.last_ping().timestamp() {
            *counts.entry(when.date_naive()).or_default() += 1;
        }
    }

    counts
        .into_iter()
        .map(|(day, flights)| DailyCount { day, flights })
        .collect()
}

/// Summary statistics
///
/// `time_bounds` is the (earliest, latest) timestamp over the whole ping log; the flight
/// figures come from `flights`.
pub fn summary(time_bounds: Option<(i64, i64)>, flights: &[Flight]) -> SummaryStats {
    let days = daily_counts(flights);
    let per_day: Vec<usize> = days.iter().map(|d| d.flights).collect();

    // Ascending dates, so a strict comparison keeps the earliest day on ties
    let mut busiest: Option<&DailyCount> = None;
    for day in &days {
        if busiest.is_none_or(|b| day.flights > b.flights) {
            busiest = Some(day);
        }
    }

    SummaryStats {
        first_ping: time_bounds.map(|(first, _)| iso8601(first)),
        last_ping: time_bounds.map(|(_, last)| iso8601(last)),
        total_flights: flights.len(),
        active_days: days.len(),
        median_flights_per_day: median(&per_day),
        max_flights_per_day: busiest.map_or(0, |b| b.flights),
        busiest_day: busiest.map(|b| b.day),
    }
}

/// Non-empty (weekday, hour) buckets of flight last-ping times, ascending
pub fn hourly_heatmap(flights: &[Flight]) -> Vec<HeatmapCell> {
    let mut cells: BTreeMap<(u32, u32), usize> = BTreeMap::new();
    for flight in flights {
        if let Some(when) = flight.last_ping().timestamp() {
            let key = (when.weekday().num_days_from_sunday(), when.hour());
            *cells.entry(key).or_default() += 1;
        }
    }

    cells
        .into_iter()
        .map(|((day_of_week, hour), flights)| HeatmapCell {
            day_of_week,
            hour,
            flights,
        })
        .collect()
}

/// Callsigns with the most flights; ties ordered by callsign ascending
pub fn top_callsigns(flights: &[Flight], limit: usize) -> Vec<CallsignCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for flight in flights {
        *counts.entry(flight.callsign.as_str()).or_default() += 1;
    }

    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    ranked.sort_by_key(|&(callsign, count)| (Reverse(count), callsign));

    ranked
        .into_iter()
        .take(limit)
        .map(|(callsign, flights)| CallsignCount {
            callsign: callsign.to_string(),
            flights,
        })
        .collect()
}

/// Complete paths of the `limit` most recently seen flights
pub fn tracks(flights: &[Flight], limit: usize) -> Vec<FlightTrack> {
    by_recency(flights)
        .into_iter()
        .take(limit)
        .map(|flight| FlightTrack {
            callsign: flight.callsign.clone(),
            sequence: flight.sequence,
            last_seen: iso8601(flight.last_ts()),
            points: flight
                .pings()
                .iter()
                .map(|p| TrackPoint {
                    ts: iso8601(p.ts),
                    lat: p.lat,
                    lon: p.lon,
                    alt_ft: p.alt_ft,
                })
                .collect(),
        })
        .collect()
}
