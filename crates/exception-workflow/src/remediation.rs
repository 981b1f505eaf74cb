//! Low-risk remediation suggestions, applied automatically only for safe
//! categories.

use recon_core::{ReconError, TradeBreak};
use recon_store::ReconDb;
use serde::{Deserialize, Serialize};

/// Variance-percentage ceiling under which a price break is treated as
/// rounding noise.
const MINOR_PRICE_VARIANCE_PCT: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemediationAction {
    RequestMissingTradeResend,
    NormalizeCounterpartyAlias,
    AcceptMinorPriceRounding,
    ManualInvestigation,
}

impl RemediationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemediationAction::RequestMissingTradeResend => "request_missing_trade_resend",
            RemediationAction::NormalizeCounterpartyAlias => "normalize_counterparty_alias",
            RemediationAction::AcceptMinorPriceRounding => "accept_minor_price_rounding",
            RemediationAction::ManualInvestigation => "manual_investigation",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Remediation {
    pub action: RemediationAction,
    pub auto_executable: bool,
    pub reason: &'static str,
}

pub struct AutoRemediator {
    db: ReconDb,
}

impl AutoRemediator {
    pub fn new(db: ReconDb) -> Self {
        Self { db }
    }

    /// Pure suggestion over a break record.
    pub fn suggest_action(brk: &TradeBreak) -> Remediation {
        if brk.break_type == "missing_trade" {
            return Remediation {
                action: RemediationAction::RequestMissingTradeResend,
                auto_executable: false,
                reason: "Requires external source confirmation",
            };
        }
        if brk.break_type == "counterparty_mismatch" {
            return Remediation {
                action: RemediationAction::NormalizeCounterpartyAlias,
                auto_executable: true,
                reason: "Likely naming standardization issue",
            };
        }
        if brk.break_type == "price_mismatch"
            && brk
                .variance_pct
                .is_some_and(|pct| pct < MINOR_PRICE_VARIANCE_PCT)
        {
            return Remediation {
                action: RemediationAction::AcceptMinorPriceRounding,
                auto_executable: true,
                reason: "Within acceptable micro-tolerance",
            };
        }

        Remediation {
            action: RemediationAction::ManualInvestigation,
            auto_executable: false,
            reason: "No safe automated path",
        }
    }

    /// Apply an action; returns `true` only if a state change was made.
    ///
    /// Alias normalization parks the break IN_PROGRESS; closing it belongs
    /// to reference-data workflows, not this engine.
    pub async fn apply_action(
        &self,
        break_id: i64,
        action: RemediationAction,
        actor: &str,
    ) -> Result<bool, ReconError> {
        match action {
            RemediationAction::AcceptMinorPriceRounding => {
                self.db
                    .resolve_break(
                        break_id,
                        action.as_str(),
                        "Automatically accepted minor price variance",
                        actor,
                    )
                    .await?;
                Ok(true)
            }
            RemediationAction::NormalizeCounterpartyAlias => {
                self.db
                    .mark_break_in_progress(
                        break_id,
                        action.as_str(),
                        "Alias normalization queued for reference data update",
                    )
                    .await?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
