use async_trait::async_trait;
use std::time::Duration;

use crate::{BreakAlert, NotificationChannel, NotificationError};

/// Posts break alerts as JSON to a generic ops webhook.
pub struct WebhookNotifier {
    webhook_url: String,
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(webhook_url: String, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self {
            webhook_url,
            client,
        }
    }
}

#[async_trait]
impl NotificationChannel for WebhookNotifier {
    async fn send(&self, alert: &BreakAlert) -> Result<(), NotificationError> {
        let payload = serde_json::json!({
            "title": alert.title,
            "message": alert.message,
            "break_id": alert.break_id,
            "break_type": alert.break_type,
            "severity": alert.severity,
            "assigned_to": alert.assigned_to,
            "escalation_time": alert.escalation_time.to_rfc3339(),
        });

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotificationError::Webhook(e.to_string()))?;

        if !response.status().is_success() {
            return Err(NotificationError::Webhook(format!(
                "webhook returned {}",
                response.status()
            )));
        }

        Ok(())
    }

    fn name(&self) -> &str {
        "ops-webhook"
    }
}
