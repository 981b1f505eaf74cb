use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

use crate::types::BreakSeverity;

/// Immutable runtime configuration, loaded once from the environment and
/// passed explicitly into each component at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconConfig {
    // Match thresholds
    pub auto_match_threshold: f64,   // 0.95
    pub manual_review_threshold: f64, // 0.75

    // Tolerances
    pub price_tolerance_pct: f64, // 0.01 (relative)
    pub quantity_tolerance: f64,  // 0 (absolute)

    // SLA windows in minutes, by severity band
    pub sla_high_priority: i64,   // 30  (critical breaks)
    pub sla_medium_priority: i64, // 120 (high breaks)
    pub sla_low_priority: i64,    // 480 (medium/low breaks)

    // Storage
    pub database_url: String,
    pub database_max_connections: u32,

    // Message broker (reserved for external schedulers; the agent binary
    // schedules in-process)
    pub broker_url: String,

    // Source connectors
    pub oms_api_url: String,
    pub oms_api_key: String,
    pub custodian_inbound_dir: String,

    // Break-prediction model artifact
    pub ml_model_path: String,
    pub break_prediction_model: String,

    // Notification sink
    pub ops_webhook_url: String,

    // Scheduling
    pub sla_sweep_interval_seconds: u64, // 900

    // External I/O deadline
    pub request_timeout_seconds: u64, // 30

    // API server bind address
    pub api_bind: String,

    pub environment: String,
}

impl ReconConfig {
    pub fn from_env() -> Result<Self> {
        let config = Self {
            auto_match_threshold: env::var("AUTO_MATCH_THRESHOLD")
                .unwrap_or_else(|_| "0.95".to_string())
                .parse()?,
            manual_review_threshold: env::var("MANUAL_REVIEW_THRESHOLD")
                .unwrap_or_else(|_| "0.75".to_string())
                .parse()?,

            price_tolerance_pct: env::var("PRICE_TOLERANCE_PCT")
                .unwrap_or_else(|_| "0.01".to_string())
                .parse()?,
            quantity_tolerance: env::var("QUANTITY_TOLERANCE")
                .unwrap_or_else(|_| "0".to_string())
                .parse()?,

            sla_high_priority: env::var("SLA_HIGH_PRIORITY")
                .unwrap_or_else(|_| "30".to_string())
                .parse()?,
            sla_medium_priority: env::var("SLA_MEDIUM_PRIORITY")
                .unwrap_or_else(|_| "120".to_string())
                .parse()?,
            sla_low_priority: env::var("SLA_LOW_PRIORITY")
                .unwrap_or_else(|_| "480".to_string())
                .parse()?,

            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:trade_recon.db".to_string()),
            database_max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()?,

            broker_url: env::var("BROKER_URL")
                .unwrap_or_else(|_| "redis://localhost:6379/0".to_string()),

            oms_api_url: env::var("OMS_API_URL").unwrap_or_default(),
            oms_api_key: env::var("OMS_API_KEY").unwrap_or_default(),
            custodian_inbound_dir: env::var("CUSTODIAN_INBOUND_DIR").unwrap_or_default(),

            ml_model_path: env::var("ML_MODEL_PATH").unwrap_or_else(|_| "./models".to_string()),
            break_prediction_model: env::var("BREAK_PREDICTION_MODEL")
                .unwrap_or_else(|_| "break_predictor_latest.json".to_string()),

            ops_webhook_url: env::var("OPS_WEBHOOK_URL").unwrap_or_default(),

            sla_sweep_interval_seconds: env::var("SLA_SWEEP_INTERVAL")
                .unwrap_or_else(|_| "900".to_string())
                .parse()?,

            request_timeout_seconds: env::var("REQUEST_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()?,

            api_bind: env::var("API_BIND").unwrap_or_else(|_| "0.0.0.0:8000".to_string()),

            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
        };

        Ok(config)
    }

    /// SLA window for a break of the given severity.
    ///
    /// Critical breaks get the tightest window; medium and low share the
    /// widest band.
    pub fn sla_minutes_for(&self, severity: BreakSeverity) -> i64 {
        match severity {
            BreakSeverity::Critical => self.sla_high_priority,
            BreakSeverity::High => self.sla_medium_priority,
            BreakSeverity::Medium | BreakSeverity::Low => self.sla_low_priority,
        }
    }
}

impl Default for ReconConfig {
    /// Built-in defaults, independent of the environment. Used by tests.
    fn default() -> Self {
        Self {
            auto_match_threshold: 0.95,
            manual_review_threshold: 0.75,
            price_tolerance_pct: 0.01,
            quantity_tolerance: 0.0,
            sla_high_priority: 30,
            sla_medium_priority: 120,
            sla_low_priority: 480,
            database_url: "sqlite:trade_recon.db".to_string(),
            database_max_connections: 5,
            broker_url: "redis://localhost:6379/0".to_string(),
            oms_api_url: String::new(),
            oms_api_key: String::new(),
            custodian_inbound_dir: String::new(),
            ml_model_path: "./models".to_string(),
            break_prediction_model: "break_predictor_latest.json".to_string(),
            ops_webhook_url: String::new(),
            sla_sweep_interval_seconds: 900,
            request_timeout_seconds: 30,
            api_bind: "0.0.0.0:8000".to_string(),
            environment: "development".to_string(),
        }
    }
}
