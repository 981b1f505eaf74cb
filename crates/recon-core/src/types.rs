use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Upstream system a trade record originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum TradeSource {
    Oms,
    Custodian,
    PrimeBroker,
    Exchange,
    Manual,
}

impl TradeSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSource::Oms => "oms",
            TradeSource::Custodian => "custodian",
            TradeSource::PrimeBroker => "prime_broker",
            TradeSource::Exchange => "exchange",
            TradeSource::Manual => "manual",
        }
    }
}

impl std::fmt::Display for TradeSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Workflow state of a break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum BreakStatus {
    Open,
    InProgress,
    Resolved,
    Escalated,
    Accepted,
}

impl BreakStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BreakStatus::Open => "open",
            BreakStatus::InProgress => "in_progress",
            BreakStatus::Resolved => "resolved",
            BreakStatus::Escalated => "escalated",
            BreakStatus::Accepted => "accepted",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum BreakSeverity {
    Critical,
    High,
    Medium,
    Low,
}

impl BreakSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            BreakSeverity::Critical => "critical",
            BreakSeverity::High => "high",
            BreakSeverity::Medium => "medium",
            BreakSeverity::Low => "low",
        }
    }
}

/// Lifecycle state of a reconciliation run record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

/// A normalized trade event as persisted.
///
/// `(source_system, source_trade_id)` is globally unique. Match-state fields
/// are only ever written by the matching orchestrator; canonical comparison
/// fields (symbol, counterparty_normalized) by the normalizer.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Trade {
    pub id: i64,
    pub source_system: TradeSource,
    pub source_trade_id: String,
    pub source_raw_data: Option<String>,
    pub trade_date: DateTime<Utc>,
    pub settlement_date: Option<DateTime<Utc>>,
    pub symbol: String,
    pub security_identifier: Option<String>,
    pub side: String,
    pub quantity: f64,
    pub price: f64,
    pub gross_amount: Option<f64>,
    pub net_amount: Option<f64>,
    pub currency: String,
    pub counterparty: Option<String>,
    pub counterparty_normalized: Option<String>,
    pub account_number: Option<String>,
    pub portfolio: Option<String>,
    pub commission: f64,
    pub fees: f64,
    pub is_matched: bool,
    pub matched_trade_id: Option<i64>,
    pub match_confidence: Option<f64>,
    pub ingested_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload for a trade coming out of an ingestion connector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTrade {
    pub source_system: TradeSource,
    pub source_trade_id: String,
    pub source_raw_data: Option<String>,
    pub trade_date: DateTime<Utc>,
    pub settlement_date: Option<DateTime<Utc>>,
    pub symbol: String,
    pub security_identifier: Option<String>,
    pub side: String,
    pub quantity: f64,
    pub price: f64,
    pub gross_amount: Option<f64>,
    pub net_amount: Option<f64>,
    pub currency: String,
    pub counterparty: Option<String>,
    pub account_number: Option<String>,
    pub portfolio: Option<String>,
    pub commission: f64,
    pub fees: f64,
}

/// One observed mismatch between two purportedly-equivalent trades, or the
/// absence of a counterpart record.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TradeBreak {
    pub id: i64,
    pub trade_id: Option<i64>,
    pub matched_trade_id: Option<i64>,
    pub break_type: String,
    pub severity: BreakSeverity,
    pub field_name: Option<String>,
    pub expected_value: Option<String>,
    pub actual_value: Option<String>,
    pub variance: Option<f64>,
    pub variance_pct: Option<f64>,
    pub pnl_impact: Option<f64>,
    pub settlement_risk: bool,
    pub status: BreakStatus,
    pub assigned_to: Option<String>,
    pub priority_score: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub sla_deadline: Option<DateTime<Utc>>,
    pub first_reviewed_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolution_notes: Option<String>,
    pub resolution_action: Option<String>,
    pub root_cause: Option<String>,
    pub resolved_by: Option<String>,
}

/// Insert payload for a break emitted by the break deriver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBreak {
    pub trade_id: Option<i64>,
    pub matched_trade_id: Option<i64>,
    pub break_type: String,
    pub severity: BreakSeverity,
    pub field_name: Option<String>,
    pub expected_value: Option<String>,
    pub actual_value: Option<String>,
    pub variance: Option<f64>,
    pub variance_pct: Option<f64>,
    pub status: BreakStatus,
    pub sla_deadline: DateTime<Utc>,
    pub priority_score: Option<f64>,
}

/// Analyst commentary attached to a break.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BreakComment {
    pub id: i64,
    pub break_id: i64,
    pub user: String,
    pub comment: String,
    pub action_taken: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Persisted matching-rule catalog entry. `match_fields` and
/// `tolerance_rules` hold JSON documents.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MatchingRule {
    pub id: i64,
    pub rule_name: String,
    pub rule_description: Option<String>,
    pub asset_class: String,
    pub trade_type: String,
    pub match_fields: Option<String>,
    pub tolerance_rules: Option<String>,
    pub priority: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Audit record for one reconciliation invocation. Created at run start,
/// finalized exactly once at run end.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ReconciliationRun {
    pub id: i64,
    pub run_date: DateTime<Utc>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub trade_date_from: Option<DateTime<Utc>>,
    pub trade_date_to: Option<DateTime<Utc>>,
    pub source_systems: Option<String>,
    pub total_trades: i64,
    pub matched_trades: i64,
    pub breaks_identified: i64,
    pub auto_resolved: i64,
    pub manual_review_required: i64,
    pub duration_seconds: Option<f64>,
    pub match_rate: Option<f64>,
    pub status: RunStatus,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Speculative break-probability score tied to a trade, kept for audit when
/// inference is invoked online.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BreakPrediction {
    pub id: i64,
    pub trade_id: i64,
    pub prediction_score: f64,
    pub predicted_break_type: Option<String>,
    pub contributing_factors: Option<String>,
    pub model_version: String,
    pub predicted_at: DateTime<Utc>,
    pub actual_break_occurred: Option<bool>,
    pub validated_at: Option<DateTime<Utc>>,
}

/// Per-run counters returned by the matching orchestrator.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ReconciliationStats {
    pub auto_matched: i64,
    pub manual_review: i64,
    pub breaks_identified: i64,
    pub unmatched_source1: i64,
    pub unmatched_source2: i64,
}

impl ReconciliationStats {
    /// Trades seen by the run across both sources.
    pub fn total_trades(&self) -> i64 {
        self.auto_matched + self.manual_review + self.unmatched_source1 + self.unmatched_source2
    }

    pub fn matched_trades(&self) -> i64 {
        self.auto_matched + self.manual_review
    }
}

/// Historical (source, counterparty, broke-or-not) observation consumed by
/// the break-prediction feature engineer.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BreakHistoryRow {
    pub source_system: TradeSource,
    pub counterparty: Option<String>,
    pub has_break: bool,
}
