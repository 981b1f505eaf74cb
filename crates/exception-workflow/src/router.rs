//! Ordered, first-match routing of breaks to owning teams, plus the SLA
//! sweep that escalates whatever sat too long.

use chrono::{DateTime, Duration, Utc};
use notification_service::{BreakAlert, NotificationService};
use recon_core::{BreakSeverity, ReconConfig, ReconError, TradeBreak};
use recon_store::ReconDb;
use serde::{Deserialize, Serialize};

/// Routing predicates as data rather than closures, so the rule table can
/// be inspected and tested.
#[derive(Debug, Clone)]
pub enum RuleKind {
    SeverityIs(BreakSeverity),
    /// Severity plus an absolute P&L impact floor. The impact is supplied
    /// by upstream enrichment; a break without one never matches.
    SeverityAndPnlOver(BreakSeverity, f64),
    BreakTypeEquals(&'static str),
    BreakTypeIn(&'static [&'static str]),
    Default,
}

#[derive(Debug, Clone)]
pub struct RoutingRule {
    pub kind: RuleKind,
    pub assign_to: &'static str,
    pub escalation_minutes: i64,
}

impl RoutingRule {
    fn matches(&self, brk: &TradeBreak) -> bool {
        match &self.kind {
            RuleKind::SeverityIs(severity) => brk.severity == *severity,
            RuleKind::SeverityAndPnlOver(severity, floor) => {
                brk.severity == *severity
                    && brk.pnl_impact.is_some_and(|impact| impact.abs() > *floor)
            }
            RuleKind::BreakTypeEquals(break_type) => brk.break_type == *break_type,
            RuleKind::BreakTypeIn(break_types) => {
                break_types.contains(&brk.break_type.as_str())
            }
            RuleKind::Default => true,
        }
    }
}

/// The production routing table, evaluated top to bottom.
pub fn default_rules() -> Vec<RoutingRule> {
    vec![
        RoutingRule {
            kind: RuleKind::SeverityIs(BreakSeverity::Critical),
            assign_to: "senior_ops_manager",
            escalation_minutes: 15,
        },
        RoutingRule {
            kind: RuleKind::SeverityAndPnlOver(BreakSeverity::High, 100_000.0),
            assign_to: "head_of_trading",
            escalation_minutes: 30,
        },
        RoutingRule {
            kind: RuleKind::BreakTypeEquals("missing_trade"),
            assign_to: "trade_support_team",
            escalation_minutes: 60,
        },
        RoutingRule {
            kind: RuleKind::BreakTypeIn(&["price_mismatch", "quantity_mismatch"]),
            assign_to: "ops_analyst",
            escalation_minutes: 120,
        },
        RoutingRule {
            kind: RuleKind::Default,
            assign_to: "ops_team",
            escalation_minutes: 240,
        },
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutedBreak {
    pub break_id: i64,
    pub assigned_to: String,
    pub escalation_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalatedBreak {
    pub break_id: i64,
    pub original_assignee: String,
    pub escalated_to: String,
}

pub struct ExceptionRouter {
    db: ReconDb,
    rules: Vec<RoutingRule>,
    notifications: NotificationService,
}

impl ExceptionRouter {
    pub fn new(db: ReconDb, config: &ReconConfig) -> Self {
        Self {
            db,
            rules: default_rules(),
            notifications: NotificationService::new(config),
        }
    }

    /// Assign a break to the first matching rule's owner and move it to
    /// IN_PROGRESS. The notification is best-effort.
    pub async fn route_exception(&self, break_id: i64) -> Result<RoutedBreak, ReconError> {
        let brk = self
            .db
            .get_break(break_id)
            .await?
            .ok_or_else(|| ReconError::NotFound(format!("Break {break_id} not found")))?;

        let rule = self
            .rules
            .iter()
            .find(|rule| rule.matches(&brk))
            .ok_or_else(|| {
                ReconError::InvariantViolated("no routing rule matched".to_string())
            })?;

        self.db.assign_break(break_id, rule.assign_to).await?;
        let escalation_time = Utc::now() + Duration::minutes(rule.escalation_minutes);

        let alert = BreakAlert::assignment(
            break_id,
            &brk.break_type,
            brk.severity,
            rule.assign_to,
            escalation_time,
        );
        self.notifications.send_alert(&alert).await;
        tracing::info!(
            "Routed break {} to {} (escalates {})",
            break_id,
            rule.assign_to,
            escalation_time
        );

        Ok(RoutedBreak {
            break_id,
            assigned_to: rule.assign_to.to_string(),
            escalation_time,
        })
    }

    /// Escalate every open or in-progress break whose SLA deadline has
    /// passed. All escalations commit in one transaction.
    pub async fn check_sla_breaches(&self) -> Result<Vec<EscalatedBreak>, ReconError> {
        let overdue = self.db.list_overdue_breaks(Utc::now()).await?;

        let escalated: Vec<EscalatedBreak> = overdue
            .iter()
            .map(|brk| {
                let original = brk.assigned_to.clone().unwrap_or_else(|| "unassigned".to_string());
                EscalatedBreak {
                    break_id: brk.id,
                    escalated_to: escalation_target(&original).to_string(),
                    original_assignee: original,
                }
            })
            .collect();

        if !escalated.is_empty() {
            let updates: Vec<(i64, String)> = escalated
                .iter()
                .map(|e| (e.break_id, e.escalated_to.clone()))
                .collect();
            self.db.escalate_breaks(&updates).await?;
            tracing::info!("Escalated {} overdue breaks", escalated.len());
        }

        Ok(escalated)
    }
}

/// Next owner up the chain when an SLA is blown.
fn escalation_target(current_assignee: &str) -> &'static str {
    match current_assignee {
        "ops_analyst" => "senior_ops_manager",
        "trade_support_team" => "ops_manager",
        "ops_team" => "ops_manager",
        "ops_manager" => "head_of_operations",
        "senior_ops_manager" => "head_of_operations",
        _ => "head_of_operations",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use recon_core::{BreakStatus, NewBreak};

    fn make_break(break_type: &str, severity: BreakSeverity) -> NewBreak {
        NewBreak {
            trade_id: None,
            matched_trade_id: None,
            break_type: break_type.to_string(),
            severity,
            field_name: None,
            expected_value: None,
            actual_value: None,
            variance: None,
            variance_pct: None,
            status: BreakStatus::Open,
            sla_deadline: Utc::now() + Duration::hours(8),
            priority_score: None,
        }
    }

    fn router_for(db: ReconDb) -> ExceptionRouter {
        ExceptionRouter::new(db, &ReconConfig::default())
    }

    #[tokio::test]
    async fn test_critical_break_routes_to_senior_ops() {
        let db = ReconDb::open("sqlite::memory:", 1).await.unwrap();
        let id = db
            .insert_break(&make_break("quantity_mismatch", BreakSeverity::Critical))
            .await
            .unwrap();

        let routed = router_for(db.clone()).route_exception(id).await.unwrap();
        assert_eq!(routed.assigned_to, "senior_ops_manager");

        let brk = db.get_break(id).await.unwrap().unwrap();
        assert_eq!(brk.status, BreakStatus::InProgress);
        assert_eq!(brk.assigned_to.as_deref(), Some("senior_ops_manager"));
    }

    #[tokio::test]
    async fn test_rule_order_missing_trade_before_default() {
        let db = ReconDb::open("sqlite::memory:", 1).await.unwrap();
        let missing = db
            .insert_break(&make_break("missing_trade", BreakSeverity::High))
            .await
            .unwrap();
        let other = db
            .insert_break(&make_break("counterparty_mismatch", BreakSeverity::Low))
            .await
            .unwrap();

        let router = router_for(db);
        assert_eq!(
            router.route_exception(missing).await.unwrap().assigned_to,
            "trade_support_team"
        );
        assert_eq!(
            router.route_exception(other).await.unwrap().assigned_to,
            "ops_team"
        );
    }

    #[tokio::test]
    async fn test_pnl_rule_requires_supplied_impact() {
        // Without pnl_impact a HIGH price break falls through to the
        // price/quantity rule
        let db = ReconDb::open("sqlite::memory:", 1).await.unwrap();
        let id = db
            .insert_break(&make_break("price_mismatch", BreakSeverity::High))
            .await
            .unwrap();

        let routed = router_for(db).route_exception(id).await.unwrap();
        assert_eq!(routed.assigned_to, "ops_analyst");
    }

    #[tokio::test]
    async fn test_unknown_break_is_not_found() {
        let db = ReconDb::open("sqlite::memory:", 1).await.unwrap();
        let err = router_for(db).route_exception(999).await.unwrap_err();
        assert!(matches!(err, ReconError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_sla_sweep_escalates_overdue_break() {
        let db = ReconDb::open("sqlite::memory:", 1).await.unwrap();

        let mut overdue = make_break("price_mismatch", BreakSeverity::Medium);
        overdue.sla_deadline = Utc::now() - Duration::minutes(1);
        let id = db.insert_break(&overdue).await.unwrap();
        db.assign_break(id, "ops_analyst").await.unwrap();

        let escalated = router_for(db.clone()).check_sla_breaches().await.unwrap();
        assert_eq!(escalated.len(), 1);
        assert_eq!(escalated[0].break_id, id);
        assert_eq!(escalated[0].original_assignee, "ops_analyst");
        assert_eq!(escalated[0].escalated_to, "senior_ops_manager");

        let brk = db.get_break(id).await.unwrap().unwrap();
        assert_eq!(brk.status, BreakStatus::Escalated);
        assert_eq!(brk.assigned_to.as_deref(), Some("senior_ops_manager"));
    }

    #[tokio::test]
    async fn test_sweep_ignores_future_deadlines_and_resolved() {
        let db = ReconDb::open("sqlite::memory:", 1).await.unwrap();

        db.insert_break(&make_break("price_mismatch", BreakSeverity::Medium))
            .await
            .unwrap();

        let mut resolved = make_break("price_mismatch", BreakSeverity::Medium);
        resolved.sla_deadline = Utc::now() - Duration::minutes(5);
        let resolved_id = db.insert_break(&resolved).await.unwrap();
        db.resolve_break(resolved_id, "accept_minor_price_rounding", "auto", "system")
            .await
            .unwrap();

        let escalated = router_for(db).check_sla_breaches().await.unwrap();
        assert!(escalated.is_empty());
    }

    #[test]
    fn test_escalation_chain_terminates_at_head_of_operations() {
        assert_eq!(escalation_target("ops_team"), "ops_manager");
        assert_eq!(escalation_target("ops_manager"), "head_of_operations");
        assert_eq!(escalation_target("head_of_operations"), "head_of_operations");
        assert_eq!(escalation_target("unassigned"), "head_of_operations");
    }
}
