use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Serialize;
use skycount::analytics_service::{AnalyticsService, AnalyticsSettings};
use skycount::config::AppConfig;
use skycount::pings_repo::PingsRepository;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportView {
    Recent,
    Daily,
    Summary,
    Heatmap,
    TopCallsigns,
    Tracks,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize report")?;
    println!("{}", json);
    Ok(())
}

/// Print one view over the stored pings to stdout
pub async fn handle_report(config: AppConfig, view: ReportView, limit: Option<usize>) -> Result<()> {
    let repo = PingsRepository::new(super::connect_database()?);
    info!("Building {:?} report over {} stored pings", view, repo.count().await?);

    let analytics = AnalyticsService::new(Arc::new(repo), AnalyticsSettings::from(&config));

    match view {
        ReportView::Recent => print_json(&analytics.recent_flights(limit).await?),
        ReportView::Daily => print_json(&analytics.daily_counts().await?),
        ReportView::Summary => print_json(&analytics.summary().await?),
        ReportView::Heatmap => print_json(&analytics.hourly_heatmap().await?),
        ReportView::TopCallsigns => print_json(&analytics.top_callsigns(limit).await?),
        ReportView::Tracks => print_json(&analytics.tracks(limit).await?),
    }
}
