//! Flight segmentation
//!
//! A flight is the maximal run of one callsign's pings in which no two consecutive
//! pings are more than `gap_seconds` apart. Flights are never persisted; they are
//! recomputed from the ping log for every query.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::pings::Ping;

/// Default inactivity gap that closes a flight (one hour)
pub const DEFAULT_GAP_SECONDS: i64 = 3600;

/// One continuous visit of a callsign through the area
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Flight {
    pub callsign: String,

    /// Zero-based session number within this callsign's ping stream
    pub sequence: u32,

    /// Member pings in non-decreasing timestamp order; never empty
    pings: Vec<Ping>,
}

impl Flight {
    /// Build a flight from time-ordered pings; `None` when `pings` is empty
    pub fn from_pings(
        callsign: impl Into<String>,
        sequence: u32,
        pings: Vec<Ping>,
    ) -> Option<Self> {
        if pings.is_empty() {
            return None;
        }
        Some(Self {
            callsign: callsign.into(),
            sequence,
            pings,
        })
    }

    pub fn pings(&self) -> &[Ping] {
        &self.pings
    }

    pub fn first_ping(&self) -> &Ping {
        &self.pings[0]
    }

    /// The representative ping: last by timestamp
    pub fn last_ping(&self) -> &Ping {
        &self.pings[self.pings.len() - 1]
    }

    pub fn first_ts(&self) -> i64 {
        self.first_ping().ts
    }

    pub fn last_ts(&self) -> i64 {
        self.last_ping().ts
    }

    pub fn duration_seconds(&self) -> i64 {
        self.last_ts() - self.first_ts()
    }
}

/// Split one callsign's pings into flights
///
/// The input must already be restricted to a single non-empty callsign and ordered by
/// timestamp ascending. A ping starts a new flight when it trails its predecessor by
/// strictly more than `gap_seconds`; a gap of exactly `gap_seconds` stays in the
/// current flight. Runs in a single pass.
pub fn segment(pings: Vec<Ping>, gap_seconds: i64) -> Vec<Flight> {
    debug_assert!(pings.windows(2).all(|w| w[0].ts <= w[1].ts));

    let mut flights: Vec<Flight> = Vec::new();
    let mut previous_ts: Option<i64> = None;
    let mut sequence: u32 = 0;

    for ping in pings {
        let ts = ping.ts;
        let joins_current = matches!(previous_ts, Some(prev) if ts - prev <= gap_seconds);

        if joins_current && let Some(current) = flights.last_mut() {
            current.pings.push(ping);
        } else {
            if previous_ts.is_some() {
                sequence += 1;
            }
            flights.push(Flight {
                callsign: ping.callsign.clone(),
                sequence,
                pings: vec![ping],
            });
        }
        previous_ts = Some(ts);
    }

    flights
}

/// Segment an arbitrary collection of pings, callsign by callsign
///
/// Pings without a callsign are skipped. Each callsign's pings are ordered by timestamp
/// (stable, so equal timestamps keep their input order) before segmenting. The result
/// is grouped by callsign ascending, then by sequence number.
pub fn segment_by_callsign<I>(pings: I, gap_seconds: i64) -> Vec<Flight>
where
    I: IntoIterator<Item = Ping>,
{
    let mut by_callsign: BTreeMap<String, Vec<Ping>> = BTreeMap::new();
    for ping in pings.into_iter().filter(Ping::has_callsign) {
        by_callsign
            .entry(ping.callsign.clone())
            .or_default()
            .push(ping);
    }

    by_callsign
        .into_values()
        .flat_map(|mut callsign_pings| {
            callsign_pings.sort_by_key(|p| p.ts);
            segment(callsign_pings, gap_seconds)
        })
        .collect()
}
