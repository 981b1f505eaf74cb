//! Scheduler agent: periodic SLA sweeps plus the daily ingest-and-reconcile
//! pipeline. Jobs run to completion; shutdown happens between jobs.

use std::time::Duration;

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use recon_core::ReconConfig;
use recon_store::ReconDb;
use tokio::signal::unix::SignalKind;
use tokio::time;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    let env_filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };
    if json_logging {
        tracing_subscriber::fmt().json().with_env_filter(env_filter()).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter()).init();
    }

    std::panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
        tracing::error!("PANIC: {info}");
    }));

    tracing::info!("Starting reconciliation agent");

    let config = ReconConfig::from_env()?;
    tracing::info!("  SLA sweep interval: {}s", config.sla_sweep_interval_seconds);
    tracing::info!("  Database: {}", config.database_url);

    let db = ReconDb::connect(&config).await?;

    let mut sweep_interval = time::interval(Duration::from_secs(config.sla_sweep_interval_seconds));
    let mut pipeline_tick = time::interval(Duration::from_secs(60));
    let mut last_pipeline_date: Option<NaiveDate> = None;

    let mut sigterm = tokio::signal::unix::signal(SignalKind::terminate())?;
    let mut sigint = tokio::signal::unix::signal(SignalKind::interrupt())?;

    loop {
        tokio::select! {
            _ = sweep_interval.tick() => {
                match recon_jobs::check_sla_breaches(&db, &config).await {
                    Ok(escalated) if !escalated.is_empty() => {
                        tracing::info!("SLA sweep escalated {} breaks", escalated.len());
                    }
                    Ok(_) => tracing::debug!("SLA sweep found nothing overdue"),
                    Err(e) => tracing::error!("SLA sweep failed: {e}"),
                }
            }
            _ = pipeline_tick.tick() => {
                let today = Utc::now().date_naive();
                if last_pipeline_date != Some(today) {
                    last_pipeline_date = Some(today);
                    match recon_jobs::daily_pipeline(&db, &config).await {
                        Ok(report) => tracing::info!(
                            "Daily pipeline done for {}: ingested {:?}, matched {}",
                            report.window_from.date_naive(),
                            report.ingestion,
                            report.reconciliation.matched_trades()
                        ),
                        Err(e) => tracing::error!("Daily pipeline failed: {e}"),
                    }
                }
            }
            _ = sigterm.recv() => {
                tracing::info!("SIGTERM received, shutting down");
                break;
            }
            _ = sigint.recv() => {
                tracing::info!("SIGINT received, shutting down");
                break;
            }
        }
    }

    Ok(())
}
