//! Connector for the OMS REST API.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use recon_core::{NewTrade, ReconConfig, ReconError, TradeConnector, TradeSource};
use serde_json::Value;
use std::time::Duration;

pub struct OmsConnector {
    api_url: String,
    api_key: String,
    timeout: Duration,
    client: Option<reqwest::Client>,
}

impl OmsConnector {
    pub fn new(config: &ReconConfig) -> Self {
        Self {
            api_url: config.oms_api_url.clone(),
            api_key: config.oms_api_key.clone(),
            timeout: Duration::from_secs(config.request_timeout_seconds),
            client: None,
        }
    }
}

#[async_trait]
impl TradeConnector for OmsConnector {
    fn source(&self) -> TradeSource {
        TradeSource::Oms
    }

    async fn connect(&mut self) -> bool {
        if self.api_url.is_empty() {
            tracing::warn!("OMS_API_URL not configured; skipping OMS ingestion");
            return false;
        }

        let mut headers = reqwest::header::HeaderMap::new();
        if !self.api_key.is_empty() {
            if let Ok(value) =
                reqwest::header::HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            {
                headers.insert(reqwest::header::AUTHORIZATION, value);
            }
        }

        let client = match reqwest::Client::builder()
            .default_headers(headers)
            .timeout(self.timeout)
            .build()
        {
            Ok(client) => client,
            Err(e) => {
                tracing::error!("Failed to build OMS client: {e}");
                return false;
            }
        };

        match client.get(format!("{}/health", self.api_url)).send().await {
            Ok(response) if !response.status().is_server_error() => {
                self.client = Some(client);
                true
            }
            Ok(response) => {
                tracing::error!("OMS health probe returned {}", response.status());
                false
            }
            Err(e) => {
                tracing::error!("Failed to connect to OMS: {e}");
                false
            }
        }
    }

    async fn fetch_trades(
        &self,
        from_date: DateTime<Utc>,
        to_date: DateTime<Utc>,
    ) -> Result<Vec<Value>, ReconError> {
        let Some(client) = &self.client else {
            return Ok(Vec::new());
        };

        let request = client
            .get(format!("{}/api/v1/trades", self.api_url))
            .query(&[
                ("start_date", from_date.to_rfc3339()),
                ("end_date", to_date.to_rfc3339()),
                ("status", "executed".to_string()),
            ]);

        // Transient failures yield an empty batch, never a failed run
        let payload: Value = match request.send().await {
            Ok(response) => match response.error_for_status() {
                Ok(response) => match response.json().await {
                    Ok(payload) => payload,
                    Err(e) => {
                        tracing::error!("Error decoding OMS trades: {e}");
                        return Ok(Vec::new());
                    }
                },
                Err(e) => {
                    tracing::error!("Error fetching OMS trades: {e}");
                    return Ok(Vec::new());
                }
            },
            Err(e) => {
                tracing::error!("Error fetching OMS trades: {e}");
                return Ok(Vec::new());
            }
        };

        let trades = payload
            .get("trades")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        tracing::info!("Fetched {} OMS trades", trades.len());
        Ok(trades)
    }

    fn normalize_trade(&self, raw: &Value) -> Result<NewTrade, ReconError> {
        let source_trade_id = raw
            .get("order_id")
            .or_else(|| raw.get("id"))
            .map(render_id)
            .unwrap_or_default();

        Ok(NewTrade {
            source_system: TradeSource::Oms,
            source_trade_id,
            source_raw_data: Some(raw.to_string()),
            trade_date: parse_datetime(raw.get("execution_time")).unwrap_or_else(Utc::now),
            settlement_date: parse_datetime(raw.get("settlement_date")),
            symbol: str_field(raw, "ticker").to_uppercase(),
            security_identifier: opt_str_field(raw, "isin"),
            side: str_field(raw, "side").to_uppercase(),
            quantity: num_field(raw, "filled_quantity"),
            price: num_field(raw, "avg_fill_price"),
            gross_amount: opt_num_field(raw, "gross_amount"),
            net_amount: opt_num_field(raw, "net_amount"),
            currency: opt_str_field(raw, "currency").unwrap_or_else(|| "USD".to_string()),
            counterparty: opt_str_field(raw, "executing_broker"),
            account_number: opt_str_field(raw, "account"),
            portfolio: opt_str_field(raw, "portfolio"),
            commission: num_field(raw, "commission"),
            fees: num_field(raw, "fees"),
        })
    }

    async fn disconnect(&mut self) {
        self.client = None;
    }
}

fn render_id(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub(crate) fn parse_datetime(value: Option<&Value>) -> Option<DateTime<Utc>> {
    let s = value?.as_str()?;
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Dates and naive timestamps are treated as UTC
    if let Ok(date) = chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
    }
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .ok()
        .map(|dt| dt.and_utc())
}

pub(crate) fn str_field(raw: &Value, key: &str) -> String {
    raw.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

pub(crate) fn opt_str_field(raw: &Value, key: &str) -> Option<String> {
    raw.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub(crate) fn num_field(raw: &Value, key: &str) -> f64 {
    opt_num_field(raw, key).unwrap_or(0.0)
}

pub(crate) fn opt_num_field(raw: &Value, key: &str) -> Option<f64> {
    let value = raw.get(key)?;
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}
