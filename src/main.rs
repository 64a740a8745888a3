use anyhow::Result;
use clap::{Parser, Subcommand};
use skycount::config::AppConfig;
use skycount::log_format::TargetFirstFormat;
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod commands;

use commands::ReportView;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

/// Version from `git describe`, falling back to the Cargo package version
const VERSION: &str = match option_env!("VERGEN_GIT_DESCRIBE") {
    Some(version) => version,
    None => env!("CARGO_PKG_VERSION"),
};

#[derive(Parser)]
#[command(name = "skycount")]
#[command(about = "Count and track the flights passing over a fixed point")]
#[command(version = VERSION)]
struct Cli {
    /// TOML configuration file (defaults to $SKYCOUNT_CONFIG, then built-in defaults)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the collector and the web API in one process
    Run {
        /// Keep pings in memory instead of PostgreSQL (lost on exit)
        #[arg(long)]
        memory: bool,
    },
    /// Run only the collector
    Collect,
    /// Serve the web API without collecting
    Serve,
    /// Apply pending database migrations and exit
    Migrate,
    /// Print one derived view as JSON
    Report {
        #[arg(value_enum)]
        view: ReportView,

        /// Maximum entries for list views
        #[arg(long)]
        limit: Option<usize>,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // Logs go to stderr so `report` output on stdout stays clean JSON
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .event_format(TargetFirstFormat::new(std::io::stderr().is_terminal()));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(sentry_tracing::layer())
        .init();
}

fn init_sentry() -> Option<sentry::ClientInitGuard> {
    let dsn = std::env::var("SENTRY_DSN").ok().filter(|dsn| !dsn.is_empty())?;

    let guard = sentry::init((
        dsn,
        sentry::ClientOptions {
            release: Some(VERSION.into()),
            environment: std::env::var("SKYCOUNT_ENV").ok().map(Into::into),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));
    Some(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let _sentry = init_sentry();
    init_tracing();
    info!("skycount {}", VERSION);

    let config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run { memory } => commands::handle_run(config, memory).await,
        Commands::Collect => commands::handle_collect(config).await,
        Commands::Serve => commands::handle_serve(config).await,
        Commands::Migrate => commands::handle_migrate().await,
        Commands::Report { view, limit } => commands::handle_report(config, view, limit).await,
    }
}
