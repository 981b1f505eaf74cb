use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use break_predictor::{BreakPredictor, RiskLevel, TradeFacts};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{AppError, AppState};

#[derive(Deserialize, utoipa::ToSchema)]
pub struct TradePredictionRequest {
    #[schema(value_type = Object)]
    pub trade: TradeFacts,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct TradePredictionResponse {
    pub break_probability: f64,
    pub predicted_break: bool,
    #[schema(value_type = String)]
    pub risk_level: RiskLevel,
    pub contributing_factors: HashMap<String, f64>,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/prediction/score", post(predict_break))
}

#[utoipa::path(
    post,
    path = "/api/v1/prediction/score",
    tag = "Prediction",
    request_body = TradePredictionRequest,
    responses(
        (status = 200, description = "Break probability and risk level", body = TradePredictionResponse),
        (status = 404, description = "Model artifact not found"),
    ),
)]
pub async fn predict_break(
    State(state): State<AppState>,
    Json(request): Json<TradePredictionRequest>,
) -> Result<Json<TradePredictionResponse>, AppError> {
    let predictor = BreakPredictor::from_config(&state.config)?;

    let history = state.db.fetch_break_history().await?;
    let outcome = predictor.predict_break_probability(&request.trade, &history);

    // Audit trail when the payload references a persisted trade
    if let Some(trade_id) = request.trade.id {
        if state.db.get_trade(trade_id).await?.is_some() {
            let factors = serde_json::to_string(&outcome.contributing_factors)
                .unwrap_or_default();
            state
                .db
                .insert_prediction(
                    trade_id,
                    outcome.break_probability,
                    None,
                    &factors,
                    predictor.model_version(),
                )
                .await?;
        }
    }

    Ok(Json(TradePredictionResponse {
        break_probability: outcome.break_probability,
        predicted_break: outcome.predicted_break,
        risk_level: outcome.risk_level,
        contributing_factors: outcome.contributing_factors,
    }))
}
