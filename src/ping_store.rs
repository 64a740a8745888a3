//! Ping store abstraction
//!
//! The collector appends batches and the analytics service reads them back. This
//! enables:
//! - Production: the Postgres-backed [`crate::pings_repo::PingsRepository`]
//! - Tests and database-less runs: [`MemoryPingStore`]
use anyhow::Result;
use async_trait::async_trait;
use std::sync::RwLock;

use crate::pings::Ping;

/// Append-only log of raw pings
#[async_trait]
pub trait PingStore: Send + Sync {
    /// Append a batch atomically: either every ping becomes visible or none does
    ///
    /// Returns the number of pings written.
    async fn append(&self, batch: Vec<Ping>) -> Result<usize>;

    /// All pings with a non-empty callsign, ordered by callsign then timestamp
    async fn pings_for_callsigns(&self) -> Result<Vec<Ping>>;

    /// Earliest and latest timestamp over every stored ping, `None` when empty
    async fn time_bounds(&self) -> Result<Option<(i64, i64)>>;
}

/// In-process ping store
///
/// A single write lock per batch gives readers either the state before or after an
/// append, never a partial batch.
#[derive(Default)]
pub struct MemoryPingStore {
    pings: RwLock<Vec<Ping>>,
}

impl MemoryPingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.pings.read().map(|p| p.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl PingStore for MemoryPingStore {
    async fn append(&self, batch: Vec<Ping>) -> Result<usize> {
        let count = batch.len();
        let mut pings = self
            .pings
            .write()
            .map_err(|_| anyhow::anyhow!("memory ping store lock poisoned"))?;
        pings.extend(batch);
        Ok(count)
    }

    async fn pings_for_callsigns(&self) -> Result<Vec<Ping>> {
        let pings = self
            .pings
            .read()
            .map_err(|_| anyhow::anyhow!("memory ping store lock poisoned"))?;

        let mut selected: Vec<Ping> = pings.iter().filter(|p| p.has_callsign()).cloned().collect();
        // Stable sort keeps insertion order for equal (callsign, ts)
        selected.sort_by(|a, b| a.callsign.cmp(&b.callsign).then(a.ts.cmp(&b.ts)));
        Ok(selected)
    }

    async fn time_bounds(&self) -> Result<Option<(i64, i64)>> {
        let pings = self
            .pings
            .read()
            .map_err(|_| anyhow::anyhow!("memory ping store lock poisoned"))?;

        let first = pings.iter().map(|p| p.ts).min();
        let last = pings.iter().map(|p| p.ts).max();
        Ok(first.zip(last))
    }
}
