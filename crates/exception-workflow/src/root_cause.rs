//! Pattern mining over historical breaks for root-cause reporting.

use recon_core::ReconError;
use recon_store::ReconDb;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RootCausePatterns {
    pub top_break_types: Vec<(String, i64)>,
    pub top_fields: Vec<(String, i64)>,
    pub top_assignees: Vec<(String, i64)>,
}

pub struct RootCauseAnalyzer {
    db: ReconDb,
}

impl RootCauseAnalyzer {
    pub fn new(db: ReconDb) -> Self {
        Self { db }
    }

    /// Top-N counts per dimension over all recorded breaks.
    pub async fn summarize_patterns(&self, limit: i64) -> Result<RootCausePatterns, ReconError> {
        Ok(RootCausePatterns {
            top_break_types: self.top_counts("break_type", limit).await?,
            top_fields: self.top_counts("field_name", limit).await?,
            top_assignees: self.top_counts("assigned_to", limit).await?,
        })
    }

    async fn top_counts(&self, column: &str, limit: i64) -> Result<Vec<(String, i64)>, ReconError> {
        // Column names come from the fixed call sites above, never from input
        let sql = format!(
            "SELECT {column} AS name, COUNT(*) AS n FROM trade_breaks \
             WHERE {column} IS NOT NULL GROUP BY {column} ORDER BY n DESC, name ASC LIMIT ?"
        );
        let rows: Vec<(String, i64)> = sqlx::query_as(&sql)
            .bind(limit)
            .fetch_all(self.db.pool())
            .await?;

        Ok(rows)
    }
}
