use chrono::{DateTime, Utc};
use recon_core::{BreakComment, BreakStatus, MatchingRule, NewBreak, ReconError, TradeBreak};
use sqlx::SqliteConnection;

use crate::db::ReconDb;

/// Insert a derived break inside an open transaction.
pub async fn insert_break_in_tx(
    conn: &mut SqliteConnection,
    brk: &NewBreak,
) -> Result<i64, ReconError> {
    let (id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO trade_breaks
        (trade_id, matched_trade_id, break_type, severity, field_name,
         expected_value, actual_value, variance, variance_pct, status,
         sla_deadline, priority_score, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(brk.trade_id)
    .bind(brk.matched_trade_id)
    .bind(&brk.break_type)
    .bind(brk.severity)
    .bind(&brk.field_name)
    .bind(&brk.expected_value)
    .bind(&brk.actual_value)
    .bind(brk.variance)
    .bind(brk.variance_pct)
    .bind(brk.status)
    .bind(brk.sla_deadline)
    .bind(brk.priority_score)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;

    Ok(id)
}

impl ReconDb {
    pub async fn insert_break(&self, brk: &NewBreak) -> Result<i64, ReconError> {
        let mut conn = self.pool().acquire().await?;
        insert_break_in_tx(&mut *conn, brk).await
    }

    pub async fn get_break(&self, id: i64) -> Result<Option<TradeBreak>, ReconError> {
        let brk = sqlx::query_as::<_, TradeBreak>("SELECT * FROM trade_breaks WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;

        Ok(brk)
    }

    /// Breaks still in the workflow (open, in progress, or escalated),
    /// newest first.
    pub async fn list_open_breaks(&self) -> Result<Vec<TradeBreak>, ReconError> {
        let breaks = sqlx::query_as::<_, TradeBreak>(
            r#"
            SELECT * FROM trade_breaks
            WHERE status IN ('open', 'in_progress', 'escalated')
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(self.pool())
        .await?;

        Ok(breaks)
    }

    /// Unprogressed breaks whose SLA deadline has passed.
    pub async fn list_overdue_breaks(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<TradeBreak>, ReconError> {
        let breaks = sqlx::query_as::<_, TradeBreak>(
            r#"
            SELECT * FROM trade_breaks
            WHERE status IN ('open', 'in_progress')
              AND sla_deadline IS NOT NULL
              AND datetime(sla_deadline) < datetime(?)
            ORDER BY id ASC
            "#,
        )
        .bind(now)
        .fetch_all(self.pool())
        .await?;

        Ok(breaks)
    }

    /// Assign a break to an owner and move it into IN_PROGRESS.
    pub async fn assign_break(&self, id: i64, assignee: &str) -> Result<(), ReconError> {
        sqlx::query("UPDATE trade_breaks SET assigned_to = ?, status = ? WHERE id = ?")
            .bind(assignee)
            .bind(BreakStatus::InProgress)
            .bind(id)
            .execute(self.pool())
            .await?;

        Ok(())
    }

    /// Escalate a batch of breaks in one transaction; the sweep commits
    /// once or not at all.
    pub async fn escalate_breaks(&self, escalations: &[(i64, String)]) -> Result<(), ReconError> {
        let mut tx = self.pool().begin().await?;

        for (id, assignee) in escalations {
            sqlx::query("UPDATE trade_breaks SET assigned_to = ?, status = ? WHERE id = ?")
                .bind(assignee)
                .bind(BreakStatus::Escalated)
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Terminal resolution write. Sets `resolved_at` so the RESOLVED
    /// invariant holds.
    pub async fn resolve_break(
        &self,
        id: i64,
        action: &str,
        notes: &str,
        resolver: &str,
    ) -> Result<(), ReconError> {
        sqlx::query(
            r#"
            UPDATE trade_breaks
            SET status = ?, resolution_action = ?, resolution_notes = ?,
                resolved_by = ?, resolved_at = ?
            WHERE id = ?
            "#,
        )
        .bind(BreakStatus::Resolved)
        .bind(action)
        .bind(notes)
        .bind(resolver)
        .bind(Utc::now())
        .bind(id)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Record a remediation action that keeps the break in flight.
    pub async fn mark_break_in_progress(
        &self,
        id: i64,
        action: &str,
        notes: &str,
    ) -> Result<(), ReconError> {
        sqlx::query(
            r#"
            UPDATE trade_breaks
            SET status = ?, resolution_action = ?, resolution_notes = ?
            WHERE id = ?
            "#,
        )
        .bind(BreakStatus::InProgress)
        .bind(action)
        .bind(notes)
        .bind(id)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    pub async fn add_break_comment(
        &self,
        break_id: i64,
        user: &str,
        comment: &str,
        action_taken: Option<&str>,
    ) -> Result<i64, ReconError> {
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO break_comments (break_id, user, comment, action_taken, created_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(break_id)
        .bind(user)
        .bind(comment)
        .bind(action_taken)
        .bind(Utc::now())
        .fetch_one(self.pool())
        .await?;

        Ok(id)
    }

    pub async fn list_break_comments(
        &self,
        break_id: i64,
    ) -> Result<Vec<BreakComment>, ReconError> {
        let comments = sqlx::query_as::<_, BreakComment>(
            "SELECT * FROM break_comments WHERE break_id = ? ORDER BY created_at ASC, id ASC",
        )
        .bind(break_id)
        .fetch_all(self.pool())
        .await?;

        Ok(comments)
    }

    /// Active matching-rule catalog entries, highest priority first.
    pub async fn list_active_matching_rules(&self) -> Result<Vec<MatchingRule>, ReconError> {
        let rules = sqlx::query_as::<_, MatchingRule>(
            "SELECT * FROM matching_rules WHERE is_active = 1 ORDER BY priority ASC, id ASC",
        )
        .fetch_all(self.pool())
        .await?;

        Ok(rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use recon_core::BreakSeverity;

    fn open_break(sla_deadline: DateTime<Utc>) -> NewBreak {
        NewBreak {
            trade_id: None,
            matched_trade_id: None,
            break_type: "price_mismatch".to_string(),
            severity: BreakSeverity::Medium,
            field_name: Some("price".to_string()),
            expected_value: Some("200.0".to_string()),
            actual_value: Some("201.0".to_string()),
            variance: Some(1.0),
            variance_pct: Some(0.5),
            status: BreakStatus::Open,
            sla_deadline,
            priority_score: Some(0.5),
        }
    }

    #[tokio::test]
    async fn test_overdue_selection() {
        let db = ReconDb::open("sqlite::memory:", 1).await.unwrap();
        let now = Utc::now();

        let overdue = db.insert_break(&open_break(now - Duration::minutes(1))).await.unwrap();
        let not_due = db.insert_break(&open_break(now + Duration::minutes(30))).await.unwrap();

        let hits = db.list_overdue_breaks(now).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, overdue);

        // Escalated breaks leave the overdue pool
        db.escalate_breaks(&[(overdue, "senior_ops_manager".to_string())])
            .await
            .unwrap();
        assert!(db.list_overdue_breaks(now).await.unwrap().is_empty());

        let still_open = db.get_break(not_due).await.unwrap().unwrap();
        assert_eq!(still_open.status, BreakStatus::Open);
    }

    #[tokio::test]
    async fn test_break_comments_roundtrip() {
        let db = ReconDb::open("sqlite::memory:", 1).await.unwrap();
        let id = db
            .insert_break(&open_break(Utc::now() + Duration::hours(8)))
            .await
            .unwrap();

        db.add_break_comment(id, "analyst1", "Confirmed with broker", Some("called_broker"))
            .await
            .unwrap();
        db.add_break_comment(id, "analyst2", "Awaiting file resend", None)
            .await
            .unwrap();

        let comments = db.list_break_comments(id).await.unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].user, "analyst1");
        assert_eq!(comments[0].action_taken.as_deref(), Some("called_broker"));
        assert_eq!(comments[1].user, "analyst2");
    }

    #[tokio::test]
    async fn test_active_matching_rules_catalog() {
        let db = ReconDb::open("sqlite::memory:", 1).await.unwrap();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO matching_rules
            (rule_name, rule_description, priority, is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind("equities_default")
        .bind("Default equity matching")
        .bind(10)
        .bind(true)
        .bind(now)
        .bind(now)
        .execute(db.pool())
        .await
        .unwrap();

        sqlx::query(
            r#"
            INSERT INTO matching_rules
            (rule_name, priority, is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind("retired_rule")
        .bind(1)
        .bind(false)
        .bind(now)
        .bind(now)
        .execute(db.pool())
        .await
        .unwrap();

        let rules = db.list_active_matching_rules().await.unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].rule_name, "equities_default");
        assert_eq!(rules[0].asset_class, "all");
        assert!(rules[0].is_active);
    }

    #[tokio::test]
    async fn test_resolution_sets_resolved_at() {
        let db = ReconDb::open("sqlite::memory:", 1).await.unwrap();
        let id = db
            .insert_break(&open_break(Utc::now() + Duration::hours(8)))
            .await
            .unwrap();

        db.resolve_break(id, "accept_minor_price_rounding", "auto", "system")
            .await
            .unwrap();

        let brk = db.get_break(id).await.unwrap().unwrap();
        assert_eq!(brk.status, BreakStatus::Resolved);
        assert!(brk.resolved_at.is_some());
        assert_eq!(brk.resolved_by.as_deref(), Some("system"));
    }
}
