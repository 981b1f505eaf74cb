use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use recon_core::{ReconError, ReconciliationStats, TradeSource};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{AppError, AppState};

#[derive(Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    #[schema(value_type = String)]
    pub timestamp: DateTime<Utc>,
    pub environment: String,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct IngestionRequest {
    #[schema(value_type = String)]
    pub from_date: DateTime<Utc>,
    #[schema(value_type = String)]
    pub to_date: DateTime<Utc>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct ReconciliationRequest {
    #[schema(value_type = String)]
    pub trade_date: DateTime<Utc>,
    #[schema(value_type = String)]
    pub source1: TradeSource,
    #[schema(value_type = String)]
    pub source2: TradeSource,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct TradeCountResponse {
    pub count: i64,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/ingestion/run", post(run_ingestion))
        .route("/reconciliation/run", post(run_reconciliation))
        .route("/trades/count", get(trade_count))
}

#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "Platform",
    responses((status = 200, description = "Service health", body = HealthResponse)),
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now(),
        environment: state.config.environment.clone(),
    })
}

#[utoipa::path(
    post,
    path = "/api/v1/ingestion/run",
    tag = "Reconciliation",
    request_body = IngestionRequest,
    responses(
        (status = 200, description = "Per-source saved counts"),
        (status = 400, description = "Invalid date range"),
    ),
)]
pub async fn run_ingestion(
    State(state): State<AppState>,
    Json(request): Json<IngestionRequest>,
) -> Result<Json<HashMap<String, i64>>, AppError> {
    if request.from_date > request.to_date {
        return Err(ReconError::Validation("from_date is after to_date".to_string()).into());
    }

    let counts = recon_jobs::run_ingestion(
        &state.db,
        &state.config,
        request.from_date,
        request.to_date,
    )
    .await;
    Ok(Json(counts))
}

#[utoipa::path(
    post,
    path = "/api/v1/reconciliation/run",
    tag = "Reconciliation",
    request_body = ReconciliationRequest,
    responses(
        (status = 200, description = "Run statistics"),
        (status = 400, description = "Invalid source pair"),
    ),
)]
pub async fn run_reconciliation(
    State(state): State<AppState>,
    Json(request): Json<ReconciliationRequest>,
) -> Result<Json<ReconciliationStats>, AppError> {
    if request.source1 == request.source2 {
        return Err(
            ReconError::Validation("source1 and source2 must differ".to_string()).into(),
        );
    }

    let stats = recon_jobs::run_reconciliation(
        &state.db,
        &state.config,
        request.trade_date,
        request.source1,
        request.source2,
    )
    .await?;
    Ok(Json(stats))
}

#[utoipa::path(
    get,
    path = "/api/v1/trades/count",
    tag = "Reconciliation",
    responses((status = 200, description = "Total persisted trades", body = TradeCountResponse)),
)]
pub async fn trade_count(
    State(state): State<AppState>,
) -> Result<Json<TradeCountResponse>, AppError> {
    let count = state.db.count_trades().await?;
    Ok(Json(TradeCountResponse { count }))
}
