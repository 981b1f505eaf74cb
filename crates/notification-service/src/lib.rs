mod webhook;

pub use webhook::WebhookNotifier;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use recon_core::{BreakSeverity, ReconConfig};
use serde::{Deserialize, Serialize};

/// A break-assignment notification dispatched to the owning team.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakAlert {
    pub break_id: i64,
    pub break_type: String,
    pub severity: BreakSeverity,
    pub assigned_to: String,
    pub escalation_time: DateTime<Utc>,
    pub title: String,
    pub message: String,
}

impl BreakAlert {
    pub fn assignment(
        break_id: i64,
        break_type: &str,
        severity: BreakSeverity,
        assigned_to: &str,
        escalation_time: DateTime<Utc>,
    ) -> Self {
        Self {
            break_id,
            break_type: break_type.to_string(),
            severity,
            assigned_to: assigned_to.to_string(),
            escalation_time,
            title: format!("Trade break #{break_id} assigned to {assigned_to}"),
            message: format!(
                "{} break #{break_id} ({break_type}) requires action before {}",
                severity.as_str(),
                escalation_time.format("%Y-%m-%d %H:%M UTC")
            ),
        }
    }
}

/// Trait for notification channels.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn send(&self, alert: &BreakAlert) -> Result<(), NotificationError>;
    fn name(&self) -> &str;
}

/// Errors from the notification system.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("Webhook error: {0}")]
    Webhook(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Dispatches alerts to all configured channels. Delivery is best-effort:
/// failures are logged and never fail the surrounding workflow.
pub struct NotificationService {
    channels: Vec<Box<dyn NotificationChannel>>,
}

impl NotificationService {
    pub fn new(config: &ReconConfig) -> Self {
        let mut channels: Vec<Box<dyn NotificationChannel>> = Vec::new();

        if !config.ops_webhook_url.is_empty() {
            channels.push(Box::new(WebhookNotifier::new(
                config.ops_webhook_url.clone(),
                std::time::Duration::from_secs(config.request_timeout_seconds),
            )));
            tracing::info!("Ops webhook notifications enabled");
        }

        if channels.is_empty() {
            tracing::info!("No notification channels configured (set OPS_WEBHOOK_URL)");
        }

        Self { channels }
    }

    /// Send to every channel, awaiting completion; failures are logged.
    pub async fn send_alert(&self, alert: &BreakAlert) {
        for channel in &self.channels {
            match channel.send(alert).await {
                Ok(()) => tracing::debug!("Sent notification via {}", channel.name()),
                Err(e) => {
                    tracing::warn!("Failed to send notification via {}: {}", channel.name(), e)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assignment_alert_carries_deadline() {
        let when = Utc::now();
        let alert = BreakAlert::assignment(
            42,
            "quantity_mismatch",
            BreakSeverity::Critical,
            "senior_ops_manager",
            when,
        );
        assert_eq!(alert.break_id, 42);
        assert!(alert.title.contains("senior_ops_manager"));
        assert!(alert.message.contains("critical"));
        assert_eq!(alert.escalation_time, when);
    }

    #[tokio::test]
    async fn test_unconfigured_service_is_a_no_op() {
        let service = NotificationService::new(&ReconConfig::default());
        let alert = BreakAlert::assignment(
            1,
            "missing_trade",
            BreakSeverity::High,
            "trade_support_team",
            Utc::now(),
        );
        // No channels; must not error or block
        service.send_alert(&alert).await;
    }
}
