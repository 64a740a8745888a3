use anyhow::Result;
use skycount::db;
use tracing::info;

pub async fn handle_migrate() -> Result<()> {
    let pool = super::connect_database()?;

    info!("Running database migrations...");
    let applied = db::run_migrations(&pool).await?;
    if applied == 0 {
        info!("Database schema is up to date");
    } else {
        info!("Applied {} migration(s)", applied);
    }
    Ok(())
}
