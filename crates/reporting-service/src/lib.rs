//! Aggregated metrics for dashboards and management reporting.

mod models;

pub use models::{AgingRow, SummaryReport};

use chrono::Utc;
use recon_core::{ReconError, ReconciliationRun};
use recon_store::ReconDb;

pub struct ReportingService {
    db: ReconDb,
}

impl ReportingService {
    pub fn new(db: ReconDb) -> Self {
        Self { db }
    }

    /// Point-in-time totals and the overall match rate.
    pub async fn summary(&self) -> Result<SummaryReport, ReconError> {
        let (total_trades,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM trades")
            .fetch_one(self.db.pool())
            .await?;
        let (matched_trades,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM trades WHERE is_matched = 1")
                .fetch_one(self.db.pool())
                .await?;
        let (total_breaks,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM trade_breaks")
            .fetch_one(self.db.pool())
            .await?;
        let (open_breaks,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM trade_breaks WHERE status IN ('open', 'in_progress', 'escalated')",
        )
        .fetch_one(self.db.pool())
        .await?;
        let (resolved_breaks,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM trade_breaks WHERE status = 'resolved'")
                .fetch_one(self.db.pool())
                .await?;

        let match_rate = if total_trades > 0 {
            matched_trades as f64 / total_trades as f64
        } else {
            0.0
        };

        Ok(SummaryReport {
            timestamp: Utc::now(),
            total_trades,
            total_breaks,
            open_breaks,
            resolved_breaks,
            match_rate: (match_rate * 10_000.0).round() / 10_000.0,
        })
    }

    /// Age and deadline of every break still in the workflow.
    pub async fn aging_report(&self) -> Result<Vec<AgingRow>, ReconError> {
        let breaks = self.db.list_open_breaks().await?;
        let now = Utc::now();

        Ok(breaks
            .into_iter()
            .map(|brk| {
                let age_hours = (now - brk.created_at).num_seconds() as f64 / 3600.0;
                AgingRow {
                    break_id: brk.id,
                    break_type: brk.break_type,
                    status: brk.status,
                    severity: brk.severity,
                    assigned_to: brk.assigned_to,
                    age_hours: (age_hours * 100.0).round() / 100.0,
                    sla_deadline: brk.sla_deadline,
                }
            })
            .collect())
    }

    /// The most recent reconciliation runs, newest first.
    pub async fn run_history(&self, limit: i64) -> Result<Vec<ReconciliationRun>, ReconError> {
        self.db.run_history(limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use recon_core::{
        BreakSeverity, BreakStatus, NewBreak, NewTrade, ReconciliationStats, TradeSource,
    };

    async fn seeded_db() -> ReconDb {
        let db = ReconDb::open("sqlite::memory:", 1).await.unwrap();

        let trade = NewTrade {
            source_system: TradeSource::Oms,
            source_trade_id: "oms-1".to_string(),
            source_raw_data: None,
            trade_date: Utc.with_ymd_and_hms(2026, 2, 24, 10, 0, 0).unwrap(),
            settlement_date: None,
            symbol: "AAPL".to_string(),
            security_identifier: None,
            side: "BUY".to_string(),
            quantity: 100.0,
            price: 200.0,
            gross_amount: None,
            net_amount: None,
            currency: "USD".to_string(),
            counterparty: None,
            account_number: None,
            portfolio: None,
            commission: 0.0,
            fees: 0.0,
        };
        db.insert_trade(&trade).await.unwrap();

        db.insert_break(&NewBreak {
            trade_id: None,
            matched_trade_id: None,
            break_type: "price_mismatch".to_string(),
            severity: BreakSeverity::Medium,
            field_name: Some("price".to_string()),
            expected_value: None,
            actual_value: None,
            variance: Some(1.0),
            variance_pct: Some(0.5),
            status: BreakStatus::Open,
            sla_deadline: Utc::now() + Duration::hours(8),
            priority_score: None,
        })
        .await
        .unwrap();

        db
    }

    #[tokio::test]
    async fn test_summary_counts() {
        let db = seeded_db().await;
        let summary = ReportingService::new(db).summary().await.unwrap();

        assert_eq!(summary.total_trades, 1);
        assert_eq!(summary.total_breaks, 1);
        assert_eq!(summary.open_breaks, 1);
        assert_eq!(summary.resolved_breaks, 0);
        assert_eq!(summary.match_rate, 0.0);
    }

    #[tokio::test]
    async fn test_aging_report_rows() {
        let db = seeded_db().await;
        let rows = ReportingService::new(db).aging_report().await.unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].break_type, "price_mismatch");
        assert!(rows[0].age_hours >= 0.0);
        assert!(rows[0].sla_deadline.is_some());
    }

    #[tokio::test]
    async fn test_run_history_orders_newest_first() {
        let db = seeded_db().await;
        let now = Utc::now();
        let first = db
            .create_run(now, now, now, &[TradeSource::Oms, TradeSource::Custodian])
            .await
            .unwrap();
        db.finalize_run_success(first, &ReconciliationStats::default(), 0.5)
            .await
            .unwrap();
        let second = db
            .create_run(now, now, now, &[TradeSource::Oms, TradeSource::Custodian])
            .await
            .unwrap();

        let runs = ReportingService::new(db).run_history(20).await.unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].id, second);
        assert_eq!(runs[1].id, first);
    }
}
