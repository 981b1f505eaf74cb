//! Field-level break derivation for a matched trade pair.

use chrono::{DateTime, Duration, Utc};
use recon_core::{BreakSeverity, BreakStatus, NewBreak, ReconConfig, Trade, TradeSource};

use crate::fuzzy::{FieldScores, MatchField};

/// Any field scoring below this is a candidate break, provided the raw
/// values actually differ.
const BREAK_SCORE_CEILING: f64 = 0.99;

pub struct BreakDeriver<'a> {
    config: &'a ReconConfig,
}

impl<'a> BreakDeriver<'a> {
    pub fn new(config: &'a ReconConfig) -> Self {
        Self { config }
    }

    /// One break per mismatched field, in canonical field order.
    pub fn identify_breaks(
        &self,
        trade1: &Trade,
        trade2: &Trade,
        field_scores: &FieldScores,
        now: DateTime<Utc>,
    ) -> Vec<NewBreak> {
        let mut breaks = Vec::new();

        for (field, score) in field_scores.iter() {
            if score >= BREAK_SCORE_CEILING {
                continue;
            }

            let Some(observed) = observe_field(field, trade1, trade2) else {
                continue;
            };

            let severity = assess_severity(field.as_str(), observed.variance, observed.variance_pct);
            breaks.push(NewBreak {
                trade_id: Some(trade1.id),
                matched_trade_id: Some(trade2.id),
                break_type: format!("{}_mismatch", field.as_str()),
                severity,
                field_name: Some(field.as_str().to_string()),
                expected_value: observed.expected,
                actual_value: observed.actual,
                variance: observed.variance,
                variance_pct: observed.variance_pct,
                status: BreakStatus::Open,
                sla_deadline: self.sla_deadline(severity, now),
                priority_score: Some(1.0 - score),
            });
        }

        breaks
    }

    /// Break for a trade with no counterpart in the other source.
    pub fn missing_trade_break(
        &self,
        trade: &Trade,
        expected_source: TradeSource,
        now: DateTime<Utc>,
    ) -> NewBreak {
        let severity = BreakSeverity::High;
        NewBreak {
            trade_id: Some(trade.id),
            matched_trade_id: None,
            break_type: "missing_trade".to_string(),
            severity,
            field_name: Some("trade_existence".to_string()),
            expected_value: Some(format!("Trade in {expected_source}")),
            actual_value: Some("Not found".to_string()),
            variance: None,
            variance_pct: None,
            status: BreakStatus::Open,
            sla_deadline: self.sla_deadline(severity, now),
            priority_score: None,
        }
    }

    fn sla_deadline(&self, severity: BreakSeverity, now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::minutes(self.config.sla_minutes_for(severity))
    }
}

struct ObservedMismatch {
    expected: Option<String>,
    actual: Option<String>,
    variance: Option<f64>,
    variance_pct: Option<f64>,
}

/// Raw-value comparison for one field; `None` when the underlying values
/// are equal (a low score alone does not make a break).
fn observe_field(field: MatchField, trade1: &Trade, trade2: &Trade) -> Option<ObservedMismatch> {
    match field {
        MatchField::Symbol => {
            string_mismatch(Some(trade1.symbol.as_str()), Some(trade2.symbol.as_str()))
        }
        MatchField::TradeDate => {
            if trade1.trade_date == trade2.trade_date {
                None
            } else {
                Some(ObservedMismatch {
                    expected: Some(trade1.trade_date.to_rfc3339()),
                    actual: Some(trade2.trade_date.to_rfc3339()),
                    variance: None,
                    variance_pct: None,
                })
            }
        }
        MatchField::Side => {
            string_mismatch(Some(trade1.side.as_str()), Some(trade2.side.as_str()))
        }
        MatchField::Quantity => numeric_mismatch(trade1.quantity, trade2.quantity),
        MatchField::Price => numeric_mismatch(trade1.price, trade2.price),
        MatchField::Counterparty => string_mismatch(
            trade1.counterparty.as_deref(),
            trade2.counterparty.as_deref(),
        ),
    }
}

fn string_mismatch(v1: Option<&str>, v2: Option<&str>) -> Option<ObservedMismatch> {
    if v1 == v2 {
        return None;
    }
    Some(ObservedMismatch {
        expected: v1.map(str::to_string),
        actual: v2.map(str::to_string),
        variance: None,
        variance_pct: None,
    })
}

fn numeric_mismatch(v1: f64, v2: f64) -> Option<ObservedMismatch> {
    if v1 == v2 {
        return None;
    }
    let variance = (v1 - v2).abs();
    let denom = v1.abs().max(v2.abs()).max(1.0);
    Some(ObservedMismatch {
        expected: Some(v1.to_string()),
        actual: Some(v2.to_string()),
        variance: Some(variance),
        variance_pct: Some(variance / denom * 100.0),
    })
}

/// Severity policy per field.
fn assess_severity(field: &str, variance: Option<f64>, variance_pct: Option<f64>) -> BreakSeverity {
    match field {
        "quantity" | "side" if variance.map_or(true, |v| v > 0.0) => BreakSeverity::Critical,
        "price" => {
            if variance_pct.is_some_and(|pct| pct > 1.0) {
                BreakSeverity::High
            } else {
                BreakSeverity::Medium
            }
        }
        "gross_amount" | "net_amount" => BreakSeverity::Medium,
        _ => BreakSeverity::Low,
    }
}
