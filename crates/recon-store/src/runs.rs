use chrono::{DateTime, Utc};
use recon_core::{ReconError, ReconciliationRun, ReconciliationStats, RunStatus, TradeSource};

use crate::db::ReconDb;

impl ReconDb {
    /// Open a run record in `running` state; finalized exactly once later.
    pub async fn create_run(
        &self,
        run_date: DateTime<Utc>,
        trade_date_from: DateTime<Utc>,
        trade_date_to: DateTime<Utc>,
        sources: &[TradeSource],
    ) -> Result<i64, ReconError> {
        let source_list = serde_json::to_string(
            &sources.iter().map(|s| s.as_str()).collect::<Vec<_>>(),
        )
        .unwrap_or_default();

        let now = Utc::now();
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO reconciliation_runs
            (run_date, start_time, trade_date_from, trade_date_to, source_systems,
             status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(run_date)
        .bind(now)
        .bind(trade_date_from)
        .bind(trade_date_to)
        .bind(source_list)
        .bind(RunStatus::Running)
        .bind(now)
        .fetch_one(self.pool())
        .await?;

        Ok(id)
    }

    pub async fn finalize_run_success(
        &self,
        id: i64,
        stats: &ReconciliationStats,
        duration_seconds: f64,
    ) -> Result<(), ReconError> {
        let total = stats.total_trades();
        let matched = stats.matched_trades();
        let match_rate = if total > 0 {
            matched as f64 / total as f64
        } else {
            0.0
        };

        sqlx::query(
            r#"
            UPDATE reconciliation_runs
            SET total_trades = ?, matched_trades = ?, breaks_identified = ?,
                manual_review_required = ?, duration_seconds = ?, match_rate = ?,
                status = ?, end_time = ?
            WHERE id = ?
            "#,
        )
        .bind(total)
        .bind(matched)
        .bind(stats.breaks_identified)
        .bind(stats.manual_review)
        .bind(duration_seconds)
        .bind(match_rate)
        .bind(RunStatus::Completed)
        .bind(Utc::now())
        .bind(id)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    pub async fn finalize_run_failed(&self, id: i64, error: &str) -> Result<(), ReconError> {
        sqlx::query(
            r#"
            UPDATE reconciliation_runs
            SET status = ?, error_message = ?, end_time = ?
            WHERE id = ?
            "#,
        )
        .bind(RunStatus::Failed)
        .bind(error)
        .bind(Utc::now())
        .bind(id)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    pub async fn get_run(&self, id: i64) -> Result<Option<ReconciliationRun>, ReconError> {
        let run = sqlx::query_as::<_, ReconciliationRun>(
            "SELECT * FROM reconciliation_runs WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        Ok(run)
    }

    pub async fn run_history(&self, limit: i64) -> Result<Vec<ReconciliationRun>, ReconError> {
        let runs = sqlx::query_as::<_, ReconciliationRun>(
            "SELECT * FROM reconciliation_runs ORDER BY created_at DESC, id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        Ok(runs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_lifecycle() {
        let db = ReconDb::open("sqlite::memory:", 1).await.unwrap();
        let now = Utc::now();

        let id = db
            .create_run(now, now, now, &[TradeSource::Oms, TradeSource::Custodian])
            .await
            .unwrap();

        let run = db.get_run(id).await.unwrap().unwrap();
        assert_eq!(run.status, RunStatus::Running);
        assert!(run.end_time.is_none());

        let stats = ReconciliationStats {
            auto_matched: 8,
            manual_review: 2,
            breaks_identified: 3,
            unmatched_source1: 0,
            unmatched_source2: 0,
        };
        db.finalize_run_success(id, &stats, 1.25).await.unwrap();

        let run = db.get_run(id).await.unwrap().unwrap();
        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(run.total_trades, 10);
        assert_eq!(run.matched_trades, 10);
        assert_eq!(run.match_rate, Some(1.0));
        assert!(run.end_time.is_some());
    }

    #[tokio::test]
    async fn test_failed_run_records_error() {
        let db = ReconDb::open("sqlite::memory:", 1).await.unwrap();
        let now = Utc::now();

        let id = db
            .create_run(now, now, now, &[TradeSource::Oms, TradeSource::Custodian])
            .await
            .unwrap();
        db.finalize_run_failed(id, "Storage error: disk I/O error")
            .await
            .unwrap();

        let run = db.get_run(id).await.unwrap().unwrap();
        assert_eq!(run.status, RunStatus::Failed);
        assert!(run.error_message.unwrap().contains("disk I/O"));
    }
}
