use anyhow::{Context, Result};
use skycount::adsb_feed::AdsbFeedClient;
use skycount::analytics_service::{AnalyticsService, AnalyticsSettings};
use skycount::collector::{Collector, initialize_collector_metrics};
use skycount::config::AppConfig;
use skycount::db;
use skycount::instance_lock::InstanceLock;
use skycount::ping_store::{MemoryPingStore, PingStore};
use skycount::pings_repo::PingsRepository;
use skycount::web::{self, AppState};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

const COLLECTOR_LOCK_NAME: &str = "skycount-collector";

/// Connect, migrate and wrap the database as a ping store
async fn database_store() -> Result<PingsRepository> {
    let pool = super::connect_database()?;
    let applied = db::run_migrations(&pool).await?;
    if applied > 0 {
        info!("Applied {} pending migration(s)", applied);
    }

    let repo = PingsRepository::new(pool);
    info!("Ping store holds {} pings", repo.count().await?);
    Ok(repo)
}

fn init_metrics() -> Result<()> {
    skycount::metrics::init_metrics()?;
    skycount::metrics::initialize_api_metrics();
    initialize_collector_metrics();
    Ok(())
}

/// Take the collector lock and launch the poll loop
fn start_collector(
    config: &AppConfig,
    store: Arc<dyn PingStore>,
) -> Result<(InstanceLock, JoinHandle<()>)> {
    let lock = InstanceLock::new(COLLECTOR_LOCK_NAME)?;

    let feed = AdsbFeedClient::new(config.feed_url(), config.feed_timeout())?;
    info!("Polling {}", feed.url());

    let collector = Collector::new(
        Arc::new(feed),
        store,
        config.track_policy(),
        config.poll_interval(),
    );
    let handle = collector
        .spawn()
        .context("Collector was already started in this process")?;

    Ok((lock, handle))
}

fn app_state(config: &AppConfig, store: Arc<dyn PingStore>) -> AppState {
    AppState {
        analytics: AnalyticsService::new(store, AnalyticsSettings::from(config)),
    }
}

/// Collector and web API sharing one ping store
pub async fn handle_run(config: AppConfig, memory: bool) -> Result<()> {
    init_metrics()?;

    let store: Arc<dyn PingStore> = if memory {
        warn!("Using in-memory ping store; collected pings are lost on exit");
        Arc::new(MemoryPingStore::new())
    } else {
        Arc::new(database_store().await?)
    };

    let (_lock, collector) = start_collector(&config, store.clone())?;

    let result = web::start_web_server(
        config.web.interface.clone(),
        config.web.port,
        app_state(&config, store),
    )
    .await;

    collector.abort();
    info!("Shutdown complete");
    result
}

/// Collector only, until Ctrl+C
pub async fn handle_collect(config: AppConfig) -> Result<()> {
    init_metrics()?;

    let store: Arc<dyn PingStore> = Arc::new(database_store().await?);
    let (_lock, collector) = start_collector(&config, store)?;

    tokio::signal::ctrl_c()
        .await
        .context("Unable to listen for shutdown signal")?;
    info!("Received shutdown signal (Ctrl+C), stopping collector");

    collector.abort();
    Ok(())
}

/// Web API only; another process owns collection
pub async fn handle_serve(config: AppConfig) -> Result<()> {
    init_metrics()?;

    let store: Arc<dyn PingStore> = Arc::new(database_store().await?);
    web::start_web_server(
        config.web.interface.clone(),
        config.web.port,
        app_state(&config, store),
    )
    .await
}
