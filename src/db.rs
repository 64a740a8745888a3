use anyhow::{Context, Result};
use diesel::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::info;

// Embed migrations into the binary
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations/");

pub type PgPool = Pool<ConnectionManager<PgConnection>>;

/// Build an r2d2 connection pool for the given database URL
pub fn create_pool(database_url: &str, max_size: u32) -> Result<PgPool> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    Pool::builder()
        .max_size(max_size)
        .build(manager)
        .context("Failed to create PostgreSQL connection pool")
}

/// Apply any pending migrations, returning how many ran
pub async fn run_migrations(pool: &PgPool) -> Result<usize> {
    let pool = pool.clone();

    tokio::task::spawn_blocking(move || {
        let mut conn = pool.get()?;
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| anyhow::anyhow!("Failed to run database migrations: {e}"))?;

        for version in &applied {
            info!("Applied migration {}", version);
        }
        Ok(applied.len())
    })
    .await?
}
