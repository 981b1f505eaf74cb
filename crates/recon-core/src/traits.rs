use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{NewTrade, ReconError, TradeSource};

/// Adapter for one upstream trade source.
///
/// `fetch_trades` returns raw, source-shaped records; `normalize_trade`
/// converts one of them into the unified schema. Transient fetch failures
/// are the connector's to swallow: log and return an empty batch, never
/// fail the surrounding ingestion.
#[async_trait]
pub trait TradeConnector: Send + Sync {
    fn source(&self) -> TradeSource;

    /// Establish the connection. `false` means not configured or not
    /// reachable; the orchestrator records zero trades and moves on.
    async fn connect(&mut self) -> bool;

    async fn fetch_trades(
        &self,
        from_date: DateTime<Utc>,
        to_date: DateTime<Utc>,
    ) -> Result<Vec<serde_json::Value>, ReconError>;

    fn normalize_trade(&self, raw: &serde_json::Value) -> Result<NewTrade, ReconError>;

    /// Reject records missing any essential field. The typed `NewTrade`
    /// guarantees presence; this guards against empty placeholders.
    fn validate_trade(&self, trade: &NewTrade) -> bool {
        !trade.source_trade_id.is_empty()
            && !trade.symbol.is_empty()
            && !trade.side.is_empty()
            && trade.quantity >= 0.0
            && trade.price >= 0.0
    }

    async fn disconnect(&mut self);
}
