//! Job entry points shared by the API server and the scheduler agent.
//!
//! Each job owns one logical unit of work against the database; the
//! reconciliation job wraps matching in a run audit record.

use chrono::{DateTime, Duration, Utc};
use exception_workflow::{EscalatedBreak, ExceptionRouter};
use ingestion_service::IngestionOrchestrator;
use matching_engine::MatchingOrchestrator;
use recon_core::{ReconConfig, ReconError, ReconciliationStats, TradeSource};
use recon_store::ReconDb;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;

/// Run matching under a run record: `running` at start, `completed` with
/// totals on success, `failed` with the error string (then rethrown) on
/// any failure.
pub async fn run_reconciliation(
    db: &ReconDb,
    config: &ReconConfig,
    trade_date: DateTime<Utc>,
    source1: TradeSource,
    source2: TradeSource,
) -> Result<ReconciliationStats, ReconError> {
    let run_id = db
        .create_run(trade_date, trade_date, trade_date, &[source1, source2])
        .await?;
    let started = Instant::now();

    let orchestrator = MatchingOrchestrator::new(db.clone(), config.clone());
    match orchestrator
        .run_reconciliation(trade_date, source1, source2)
        .await
    {
        Ok(stats) => {
            db.finalize_run_success(run_id, &stats, started.elapsed().as_secs_f64())
                .await?;
            Ok(stats)
        }
        Err(err) => {
            tracing::error!("Reconciliation run {run_id} failed: {err}");
            if let Err(mark_err) = db.finalize_run_failed(run_id, &err.to_string()).await {
                tracing::error!("Could not mark run {run_id} failed: {mark_err}");
            }
            Err(err)
        }
    }
}

/// Ingest all configured sources for the window.
pub async fn run_ingestion(
    db: &ReconDb,
    config: &ReconConfig,
    from_date: DateTime<Utc>,
    to_date: DateTime<Utc>,
) -> HashMap<String, i64> {
    IngestionOrchestrator::new(db.clone(), config)
        .ingest_all_sources(from_date, to_date)
        .await
}

/// Escalate every break whose SLA deadline has passed.
pub async fn check_sla_breaches(
    db: &ReconDb,
    config: &ReconConfig,
) -> Result<Vec<EscalatedBreak>, ReconError> {
    ExceptionRouter::new(db.clone(), config)
        .check_sla_breaches()
        .await
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyPipelineReport {
    pub window_from: DateTime<Utc>,
    pub window_to: DateTime<Utc>,
    pub ingestion: HashMap<String, i64>,
    pub reconciliation: ReconciliationStats,
}

/// The daily yesterday-to-today pipeline: ingest, then reconcile OMS
/// against the custodian.
pub async fn daily_pipeline(
    db: &ReconDb,
    config: &ReconConfig,
) -> Result<DailyPipelineReport, ReconError> {
    let today = Utc::now()
        .date_naive()
        .and_time(chrono::NaiveTime::MIN)
        .and_utc();
    let yesterday = today - Duration::days(1);

    let ingestion = run_ingestion(db, config, yesterday, today).await;
    let reconciliation = run_reconciliation(
        db,
        config,
        yesterday,
        TradeSource::Oms,
        TradeSource::Custodian,
    )
    .await?;

    Ok(DailyPipelineReport {
        window_from: yesterday,
        window_to: today,
        ingestion,
        reconciliation,
    })
}
