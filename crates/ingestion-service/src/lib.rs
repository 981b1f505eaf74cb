//! Coordinates trade ingestion from all configured sources.

pub mod custodian;
pub mod oms;

pub use custodian::CustodianConnector;
pub use oms::OmsConnector;

use chrono::{DateTime, Utc};
use recon_core::{ReconConfig, TradeConnector};
use recon_store::ReconDb;
use std::collections::HashMap;

pub struct IngestionOrchestrator {
    db: ReconDb,
    connectors: Vec<Box<dyn TradeConnector>>,
}

impl IngestionOrchestrator {
    pub fn new(db: ReconDb, config: &ReconConfig) -> Self {
        Self {
            db,
            connectors: vec![
                Box::new(OmsConnector::new(config)),
                Box::new(CustodianConnector::new(config)),
            ],
        }
    }

    #[cfg(test)]
    fn with_connectors(db: ReconDb, connectors: Vec<Box<dyn TradeConnector>>) -> Self {
        Self { db, connectors }
    }

    /// Ingest every source for the window, returning per-source saved
    /// counts. A source that cannot connect, fails transiently, or hits a
    /// storage error contributes zero; the others still ingest.
    pub async fn ingest_all_sources(
        &mut self,
        from_date: DateTime<Utc>,
        to_date: DateTime<Utc>,
    ) -> HashMap<String, i64> {
        let mut results = HashMap::new();

        for connector in &mut self.connectors {
            let source = connector.source();
            tracing::info!("Ingesting from {source}");

            if !connector.connect().await {
                results.insert(source.to_string(), 0);
                continue;
            }

            let saved = ingest_one_source(&self.db, connector.as_ref(), from_date, to_date).await;

            connector.disconnect().await;
            results.insert(source.to_string(), saved);
            tracing::info!("Saved {saved} trades from {source}");
        }

        results
    }
}

/// Fetch, normalize, validate, and insert one source's batch. Per-record
/// failures are logged and skipped; a storage error stops the source and
/// yields the partial count saved so far.
async fn ingest_one_source(
    db: &ReconDb,
    connector: &dyn TradeConnector,
    from_date: DateTime<Utc>,
    to_date: DateTime<Utc>,
) -> i64 {
    let raw_trades = match connector.fetch_trades(from_date, to_date).await {
        Ok(raw_trades) => raw_trades,
        Err(e) => {
            tracing::error!("Fetch failed for {}: {e}", connector.source());
            return 0;
        }
    };

    let mut saved = 0;
    for raw in &raw_trades {
        let normalized = match connector.normalize_trade(raw) {
            Ok(trade) => trade,
            Err(e) => {
                tracing::error!(
                    "Normalization failed for {} trade: {e}",
                    connector.source()
                );
                continue;
            }
        };
        if !connector.validate_trade(&normalized) {
            continue;
        }

        // Duplicate identities are benign no-ops
        match db.insert_trade(&normalized).await {
            Ok(Some(_)) => saved += 1,
            Ok(None) => {}
            Err(e) => {
                tracing::error!("Storage error ingesting from {}: {e}", connector.source());
                break;
            }
        }
    }

    saved
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use recon_core::{NewTrade, ReconError, TradeSource};
    use serde_json::Value;

    struct StubConnector {
        source: TradeSource,
        reachable: bool,
        rows: Vec<Value>,
    }

    #[async_trait]
    impl TradeConnector for StubConnector {
        fn source(&self) -> TradeSource {
            self.source
        }

        async fn connect(&mut self) -> bool {
            self.reachable
        }

        async fn fetch_trades(
            &self,
            _from: DateTime<Utc>,
            _to: DateTime<Utc>,
        ) -> Result<Vec<Value>, ReconError> {
            Ok(self.rows.clone())
        }

        fn normalize_trade(&self, raw: &Value) -> Result<NewTrade, ReconError> {
            let id = raw
                .get("id")
                .and_then(Value::as_str)
                .ok_or_else(|| ReconError::Validation("missing id".to_string()))?;
            Ok(NewTrade {
                source_system: self.source,
                source_trade_id: id.to_string(),
                source_raw_data: Some(raw.to_string()),
                trade_date: Utc.with_ymd_and_hms(2026, 2, 24, 10, 0, 0).unwrap(),
                settlement_date: None,
                symbol: "AAPL".to_string(),
                security_identifier: None,
                side: "BUY".to_string(),
                quantity: 100.0,
                price: 200.0,
                gross_amount: None,
                net_amount: None,
                currency: "USD".to_string(),
                counterparty: None,
                account_number: None,
                portfolio: None,
                commission: 0.0,
                fees: 0.0,
            })
        }

        async fn disconnect(&mut self) {}
    }

    #[tokio::test]
    async fn test_ingest_counts_per_source_and_skips_bad_rows() {
        let db = ReconDb::open("sqlite::memory:", 1).await.unwrap();
        let mut orchestrator = IngestionOrchestrator::with_connectors(
            db.clone(),
            vec![
                Box::new(StubConnector {
                    source: TradeSource::Oms,
                    reachable: true,
                    rows: vec![
                        serde_json::json!({"id": "a"}),
                        serde_json::json!({"id": "b"}),
                        serde_json::json!({"broken": true}),
                        serde_json::json!({"id": "a"}), // duplicate identity
                    ],
                }),
                Box::new(StubConnector {
                    source: TradeSource::Custodian,
                    reachable: false,
                    rows: vec![serde_json::json!({"id": "c"})],
                }),
            ],
        );

        let counts = orchestrator
            .ingest_all_sources(Utc::now(), Utc::now())
            .await;

        assert_eq!(counts["oms"], 2);
        assert_eq!(counts["custodian"], 0);
        assert_eq!(db.count_trades().await.unwrap(), 2);
    }
}
