pub mod migrate;
pub mod report;
pub mod run;

pub use migrate::handle_migrate;
pub use report::{ReportView, handle_report};
pub use run::{handle_collect, handle_run, handle_serve};

use anyhow::{Context, Result};
use skycount::db::{self, PgPool};
use std::env;
use tracing::info;

/// r2d2 pool size for the API and collector
const DATABASE_POOL_SIZE: u32 = 10;

/// Connect to `DATABASE_URL`
pub(crate) fn connect_database() -> Result<PgPool> {
    let database_url =
        env::var("DATABASE_URL").context("DATABASE_URL must be set in environment variables")?;
    let pool = db::create_pool(&database_url, DATABASE_POOL_SIZE)?;
    info!("Connected to PostgreSQL (pool size {})", DATABASE_POOL_SIZE);
    Ok(pool)
}
