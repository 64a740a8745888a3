//! Periodic feed collection
//!
//! Once per poll interval the collector fetches the current aircraft list, drops every
//! report outside the storage radius (or without coordinates), stamps the survivors
//! with the collection time and appends them to the ping store as one batch. A failed
//! cycle is logged and the loop carries on with the next interval.

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::adsb_feed::{AircraftRecord, PositionFeed};
use crate::geofence::RadiusPolicy;
use crate::ping_store::PingStore;
use crate::pings::Ping;

/// Process-wide guard so the collector loop is launched at most once
static COLLECTOR_STARTED: CollectorGuard = CollectorGuard::new();

/// Outcome of a single collection cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Records returned by the feed
    pub fetched: usize,
    /// Pings appended to the store
    pub stored: usize,
    /// Records without coordinates or outside the storage radius
    pub dropped: usize,
}

/// Atomic "already started" flag
pub struct CollectorGuard {
    started: AtomicBool,
}

impl CollectorGuard {
    pub const fn new() -> Self {
        Self {
            started: AtomicBool::new(false),
        }
    }

    /// Returns true exactly once, for the first caller
    pub fn try_start(&self) -> bool {
        self.started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }
}

impl Default for CollectorGuard {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert feed records into pings inside `policy`, returning the pings and the number dropped
pub fn filter_records(
    records: &[AircraftRecord],
    collected_at: i64,
    policy: &RadiusPolicy,
) -> (Vec<Ping>, usize) {
    let pings: Vec<Ping> = records
        .iter()
        .filter_map(|record| record.to_ping(collected_at))
        .filter(|ping| policy.contains(ping.point()))
        .collect();
    let dropped = records.len() - pings.len();
    (pings, dropped)
}

/// The sole writer to the ping store
#[derive(Clone)]
pub struct Collector {
    feed: Arc<dyn PositionFeed>,
    store: Arc<dyn PingStore>,
    policy: RadiusPolicy,
    interval: Duration,
}

impl Collector {
    pub fn new(
        feed: Arc<dyn PositionFeed>,
        store: Arc<dyn PingStore>,
        policy: RadiusPolicy,
        interval: Duration,
    ) -> Self {
        Self {
            feed,
            store,
            policy,
            interval,
        }
    }

    /// Run one fetch-filter-append cycle with `now` as the shared ping timestamp
    pub async fn collect_once(&self, now: DateTime<Utc>) -> Result<CycleReport> {
        let records = self.feed.fetch().await?;
        let (pings, dropped) = filter_records(&records, now.timestamp(), &self.policy);

        let stored = if pings.is_empty() {
            0
        } else {
            self.store.append(pings).await?
        };

        Ok(CycleReport {
            fetched: records.len(),
            stored,
            dropped,
        })
    }

    /// Collect forever; individual cycle failures are logged and skipped
    pub async fn run(self) {
        info!(
            "Collector started: every {}s, storage radius {} km around {:.4},{:.4}",
            self.interval.as_secs(),
            self.policy.radius_km,
            self.policy.center.latitude,
            self.policy.center.longitude
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            metrics::counter!("collector.cycles_total").increment(1);

            match self.collect_once(Utc::now()).await {
                Ok(report) => {
                    metrics::counter!("collector.pings_stored_total")
                        .increment(report.stored as u64);
                    metrics::counter!("collector.pings_dropped_total")
                        .increment(report.dropped as u64);
                    if report.stored > 0 {
                        info!(
                            "Saved batch: {} stored, {} dropped of {} aircraft",
                            report.stored, report.dropped, report.fetched
                        );
                    } else {
                        debug!("No aircraft inside the area ({} fetched)", report.fetched);
                    }
                }
                Err(e) => {
                    metrics::counter!("collector.cycle_errors_total").increment(1);
                    error!("Collection cycle failed: {:#}", e);
                }
            }
        }
    }

    /// Spawn the collection loop unless `guard` says it already runs
    pub fn spawn_with_guard(self, guard: &CollectorGuard) -> Option<JoinHandle<()>> {
        if !guard.try_start() {
            debug!("Collector already running, not starting another");
            return None;
        }
        Some(tokio::spawn(self.run()))
    }

    /// Spawn the collection loop at most once per process
    pub fn spawn(self) -> Option<JoinHandle<()>> {
        self.spawn_with_guard(&COLLECTOR_STARTED)
    }
}

/// Zero the collector counters so they are exported before the first cycle
pub fn initialize_collector_metrics() {
    metrics::counter!("collector.cycles_total").absolute(0);
    metrics::counter!("collector.cycle_errors_total").absolute(0);
    metrics::counter!("collector.pings_stored_total").absolute(0);
    metrics::counter!("collector.pings_dropped_total").absolute(0);
}
