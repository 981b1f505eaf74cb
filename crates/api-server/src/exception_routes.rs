use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use exception_workflow::{AutoRemediator, EscalatedBreak, ExceptionRouter, Remediation, RoutedBreak};
use recon_core::{BreakSeverity, BreakStatus, ReconError, TradeBreak};
use serde::Serialize;

use crate::{AppError, AppState};

/// Workflow-facing projection of a break record.
#[derive(Serialize, utoipa::ToSchema)]
pub struct BreakView {
    pub id: i64,
    pub trade_id: Option<i64>,
    pub break_type: String,
    #[schema(value_type = String)]
    pub severity: BreakSeverity,
    #[schema(value_type = String)]
    pub status: BreakStatus,
    pub assigned_to: Option<String>,
    #[schema(value_type = String)]
    pub created_at: DateTime<Utc>,
}

impl From<TradeBreak> for BreakView {
    fn from(brk: TradeBreak) -> Self {
        Self {
            id: brk.id,
            trade_id: brk.trade_id,
            break_type: brk.break_type,
            severity: brk.severity,
            status: brk.status,
            assigned_to: brk.assigned_to,
            created_at: brk.created_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct RemediationResponse {
    pub break_id: i64,
    #[schema(value_type = Object)]
    pub suggestion: Remediation,
    pub applied: bool,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/exceptions/:id/route", post(route_exception))
        .route("/exceptions/:id/auto-remediate", post(auto_remediate))
        .route("/exceptions/overdue", get(overdue_exceptions))
        .route("/breaks/open", get(list_open_breaks))
}

#[utoipa::path(
    post,
    path = "/api/v1/exceptions/{id}/route",
    tag = "Exceptions",
    params(("id" = i64, Path, description = "Break id")),
    responses(
        (status = 200, description = "Break routed to an owner"),
        (status = 404, description = "Break not found"),
    ),
)]
pub async fn route_exception(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<RoutedBreak>, AppError> {
    let router = ExceptionRouter::new(state.db.clone(), &state.config);
    let routed = router.route_exception(id).await?;
    Ok(Json(routed))
}

#[utoipa::path(
    post,
    path = "/api/v1/exceptions/{id}/auto-remediate",
    tag = "Exceptions",
    params(("id" = i64, Path, description = "Break id")),
    responses(
        (status = 200, description = "Suggestion, applied when safe", body = RemediationResponse),
        (status = 404, description = "Break not found"),
    ),
)]
pub async fn auto_remediate(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<RemediationResponse>, AppError> {
    let brk = state
        .db
        .get_break(id)
        .await?
        .ok_or_else(|| ReconError::NotFound(format!("Break {id} not found")))?;

    let suggestion = AutoRemediator::suggest_action(&brk);
    let applied = if suggestion.auto_executable {
        AutoRemediator::new(state.db.clone())
            .apply_action(id, suggestion.action, "system")
            .await?
    } else {
        false
    };

    Ok(Json(RemediationResponse {
        break_id: id,
        suggestion,
        applied,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/exceptions/overdue",
    tag = "Exceptions",
    responses((status = 200, description = "Breaks escalated by this sweep")),
)]
pub async fn overdue_exceptions(
    State(state): State<AppState>,
) -> Result<Json<Vec<EscalatedBreak>>, AppError> {
    let escalated = recon_jobs::check_sla_breaches(&state.db, &state.config).await?;
    Ok(Json(escalated))
}

#[utoipa::path(
    get,
    path = "/api/v1/breaks/open",
    tag = "Exceptions",
    responses((status = 200, description = "Open, in-progress, and escalated breaks, newest first")),
)]
pub async fn list_open_breaks(
    State(state): State<AppState>,
) -> Result<Json<Vec<BreakView>>, AppError> {
    let breaks = state.db.list_open_breaks().await?;
    Ok(Json(breaks.into_iter().map(BreakView::from).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use recon_core::{NewBreak, ReconConfig};
    use recon_store::ReconDb;
    use std::sync::Arc;

    async fn test_state() -> AppState {
        AppState {
            db: ReconDb::open("sqlite::memory:", 1).await.unwrap(),
            config: Arc::new(ReconConfig::default()),
        }
    }

    fn make_break(break_type: &str, variance_pct: Option<f64>) -> NewBreak {
        NewBreak {
            trade_id: None,
            matched_trade_id: None,
            break_type: break_type.to_string(),
            severity: BreakSeverity::Medium,
            field_name: None,
            expected_value: None,
            actual_value: None,
            variance: None,
            variance_pct,
            status: BreakStatus::Open,
            sla_deadline: Utc::now() + Duration::hours(8),
            priority_score: None,
        }
    }

    #[tokio::test]
    async fn test_route_unknown_break_is_not_found() {
        let state = test_state().await;
        let err = route_exception(State(state), Path(12345)).await.err();
        assert!(matches!(err, Some(AppError::Recon(ReconError::NotFound(_)))));
    }

    #[tokio::test]
    async fn test_auto_remediate_applies_safe_action() {
        let state = test_state().await;
        let id = state
            .db
            .insert_break(&make_break("price_mismatch", Some(0.05)))
            .await
            .unwrap();

        let response = auto_remediate(State(state.clone()), Path(id)).await.unwrap();
        assert!(response.0.applied);

        let brk = state.db.get_break(id).await.unwrap().unwrap();
        assert_eq!(brk.status, BreakStatus::Resolved);
    }

    #[tokio::test]
    async fn test_open_breaks_listing() {
        let state = test_state().await;
        state
            .db
            .insert_break(&make_break("missing_trade", None))
            .await
            .unwrap();

        let response = list_open_breaks(State(state)).await.unwrap();
        assert_eq!(response.0.len(), 1);
        assert_eq!(response.0[0].break_type, "missing_trade");
    }
}
