use chrono::{DateTime, Utc};
use recon_core::{BreakSeverity, BreakStatus};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryReport {
    pub timestamp: DateTime<Utc>,
    pub total_trades: i64,
    pub total_breaks: i64,
    pub open_breaks: i64,
    pub resolved_breaks: i64,
    pub match_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgingRow {
    pub break_id: i64,
    pub break_type: String,
    pub status: BreakStatus,
    pub severity: BreakSeverity,
    pub assigned_to: Option<String>,
    pub age_hours: f64,
    pub sla_deadline: Option<DateTime<Utc>>,
}
