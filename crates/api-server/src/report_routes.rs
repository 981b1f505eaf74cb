use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use exception_workflow::{RootCauseAnalyzer, RootCausePatterns};
use recon_core::ReconciliationRun;
use reporting_service::{AgingRow, ReportingService, SummaryReport};

use crate::{AppError, AppState};

const RUN_HISTORY_LIMIT: i64 = 20;
const ROOT_CAUSE_LIMIT: i64 = 10;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/reports/summary", get(report_summary))
        .route("/reports/aging", get(report_aging))
        .route("/reports/runs", get(report_runs))
        .route("/reports/root-cause", get(report_root_cause))
}

#[utoipa::path(
    get,
    path = "/api/v1/reports/summary",
    tag = "Reports",
    responses((status = 200, description = "Totals and match rate")),
)]
pub async fn report_summary(
    State(state): State<AppState>,
) -> Result<Json<SummaryReport>, AppError> {
    let summary = ReportingService::new(state.db.clone()).summary().await?;
    Ok(Json(summary))
}

#[utoipa::path(
    get,
    path = "/api/v1/reports/aging",
    tag = "Reports",
    responses((status = 200, description = "Ages of breaks still in the workflow")),
)]
pub async fn report_aging(State(state): State<AppState>) -> Result<Json<Vec<AgingRow>>, AppError> {
    let rows = ReportingService::new(state.db.clone()).aging_report().await?;
    Ok(Json(rows))
}

#[utoipa::path(
    get,
    path = "/api/v1/reports/runs",
    tag = "Reports",
    responses((status = 200, description = "Recent reconciliation runs")),
)]
pub async fn report_runs(
    State(state): State<AppState>,
) -> Result<Json<Vec<ReconciliationRun>>, AppError> {
    let runs = ReportingService::new(state.db.clone())
        .run_history(RUN_HISTORY_LIMIT)
        .await?;
    Ok(Json(runs))
}

#[utoipa::path(
    get,
    path = "/api/v1/reports/root-cause",
    tag = "Reports",
    responses((status = 200, description = "Top break types, fields, and assignees")),
)]
pub async fn report_root_cause(
    State(state): State<AppState>,
) -> Result<Json<RootCausePatterns>, AppError> {
    let patterns = RootCauseAnalyzer::new(state.db.clone())
        .summarize_patterns(ROOT_CAUSE_LIMIT)
        .await?;
    Ok(Json(patterns))
}
