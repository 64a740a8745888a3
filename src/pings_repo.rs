use anyhow::{Context, Result};
use async_trait::async_trait;
use diesel::dsl::{max, min};
use diesel::prelude::*;
use tracing::debug;

use crate::db::PgPool;
use crate::ping_store::PingStore;
use crate::pings::Ping;

// Postgres caps bind parameters at 65535 per statement; 7 columns per row
const INSERT_CHUNK_SIZE: usize = 1000;

/// Postgres-backed ping store over the `positions` table
#[derive(Clone)]
pub struct PingsRepository {
    pool: PgPool,
}

impl PingsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Total number of stored pings
    pub async fn count(&self) -> Result<i64> {
        use crate::schema::positions::dsl::*;

        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            let total = positions.count().get_result::<i64>(&mut conn)?;
            Ok(total)
        })
        .await?
    }
}

#[async_trait]
impl PingStore for PingsRepository {
    async fn append(&self, batch: Vec<Ping>) -> Result<usize> {
        use crate::schema::positions;

        if batch.is_empty() {
            return Ok(0);
        }

        let pool = self.pool.clone();
        let written = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;

            // One transaction per batch so a failure leaves earlier batches untouched
            conn.transaction::<_, anyhow::Error, _>(|conn| {
                let mut written = 0;
                for chunk in batch.chunks(INSERT_CHUNK_SIZE) {
                    written += diesel::insert_into(positions::table)
                        .values(chunk)
                        .execute(conn)?;
                }
                Ok(written)
            })
        })
        .await?
        .context("Failed to append ping batch")?;

        debug!("Appended {} pings", written);
        Ok(written)
    }

    async fn pings_for_callsigns(&self) -> Result<Vec<Ping>> {
        use crate::schema::positions::dsl::*;

        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;

            let results = positions
                .filter(callsign.ne(""))
                .order((callsign.asc(), ts.asc(), id.asc()))
                .select(Ping::as_select())
                .load::<Ping>(&mut conn)
                .context("Failed to load pings")?;

            Ok(results)
        })
        .await?
    }

    async fn time_bounds(&self) -> Result<Option<(i64, i64)>> {
        use crate::schema::positions::dsl::*;

        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;

            let (first, last) = positions
                .select((min(ts), max(ts)))
                .first::<(Option<i64>, Option<i64>)>(&mut conn)
                .context("Failed to query ping time bounds")?;

            Ok(first.zip(last))
        })
        .await?
    }
}
