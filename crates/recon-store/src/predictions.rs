use chrono::Utc;
use recon_core::ReconError;

use crate::db::ReconDb;

impl ReconDb {
    /// Audit record for one online inference call.
    pub async fn insert_prediction(
        &self,
        trade_id: i64,
        prediction_score: f64,
        predicted_break_type: Option<&str>,
        contributing_factors: &str,
        model_version: &str,
    ) -> Result<i64, ReconError> {
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO break_predictions
            (trade_id, prediction_score, predicted_break_type, contributing_factors,
             model_version, predicted_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(trade_id)
        .bind(prediction_score)
        .bind(predicted_break_type)
        .bind(contributing_factors)
        .bind(model_version)
        .bind(Utc::now())
        .fetch_one(self.pool())
        .await?;

        Ok(id)
    }
}
