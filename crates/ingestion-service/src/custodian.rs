//! Connector for custodian trade files dropped as `trades_YYYYMMDD.csv`
//! into a local inbound directory after transfer.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use recon_core::{NewTrade, ReconConfig, ReconError, TradeConnector, TradeSource};
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::oms::{num_field, opt_num_field, opt_str_field, parse_datetime, str_field};

pub struct CustodianConnector {
    inbound_dir: String,
    connected: bool,
}

impl CustodianConnector {
    pub fn new(config: &ReconConfig) -> Self {
        Self {
            inbound_dir: config.custodian_inbound_dir.clone(),
            connected: false,
        }
    }
}

#[async_trait]
impl TradeConnector for CustodianConnector {
    fn source(&self) -> TradeSource {
        TradeSource::Custodian
    }

    async fn connect(&mut self) -> bool {
        if self.inbound_dir.is_empty() {
            tracing::warn!("CUSTODIAN_INBOUND_DIR not configured; skipping custodian ingestion");
            return false;
        }
        if !Path::new(&self.inbound_dir).is_dir() {
            tracing::error!("Custodian inbound dir {} does not exist", self.inbound_dir);
            return false;
        }
        self.connected = true;
        true
    }

    async fn fetch_trades(
        &self,
        from_date: DateTime<Utc>,
        to_date: DateTime<Utc>,
    ) -> Result<Vec<Value>, ReconError> {
        if !self.connected {
            return Ok(Vec::new());
        }

        let mut files: Vec<PathBuf> = Vec::new();
        let entries = match std::fs::read_dir(&self.inbound_dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::error!("Error listing custodian files: {e}");
                return Ok(Vec::new());
            }
        };

        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            if file_date_in_window(&name, from_date.date_naive(), to_date.date_naive()) {
                files.push(entry.path());
            }
        }
        files.sort();

        let mut all_trades = Vec::new();
        for path in &files {
            match std::fs::read_to_string(path) {
                Ok(content) => all_trades.extend(parse_csv_records(&content)),
                Err(e) => tracing::error!("Error reading {}: {e}", path.display()),
            }
        }

        tracing::info!(
            "Loaded {} custodian trades from {} files",
            all_trades.len(),
            files.len()
        );
        Ok(all_trades)
    }

    fn normalize_trade(&self, raw: &Value) -> Result<NewTrade, ReconError> {
        let side = if str_field(raw, "BuySellIndicator").to_uppercase() == "B" {
            "BUY"
        } else {
            "SELL"
        };

        Ok(NewTrade {
            source_system: TradeSource::Custodian,
            source_trade_id: str_field(raw, "TradeID"),
            source_raw_data: Some(raw.to_string()),
            trade_date: parse_datetime(raw.get("TradeDate")).unwrap_or_else(Utc::now),
            settlement_date: parse_datetime(raw.get("SettleDate")),
            symbol: str_field(raw, "Symbol").to_uppercase(),
            security_identifier: opt_str_field(raw, "CUSIP"),
            side: side.to_string(),
            quantity: num_field(raw, "Quantity"),
            price: num_field(raw, "Price"),
            gross_amount: opt_num_field(raw, "GrossAmount"),
            net_amount: opt_num_field(raw, "NetAmount"),
            currency: opt_str_field(raw, "Currency").unwrap_or_else(|| "USD".to_string()),
            counterparty: opt_str_field(raw, "Counterparty"),
            account_number: opt_str_field(raw, "Account"),
            portfolio: opt_str_field(raw, "Portfolio"),
            commission: num_field(raw, "Commission"),
            fees: num_field(raw, "Fees"),
        })
    }

    async fn disconnect(&mut self) {
        self.connected = false;
    }
}

/// `trades_YYYYMMDD.csv` whose date falls inside `[from, to]`.
fn file_date_in_window(filename: &str, from: NaiveDate, to: NaiveDate) -> bool {
    let Some(date_str) = filename
        .strip_prefix("trades_")
        .and_then(|rest| rest.strip_suffix(".csv"))
    else {
        return false;
    };
    match NaiveDate::parse_from_str(date_str, "%Y%m%d") {
        Ok(date) => from <= date && date <= to,
        Err(_) => false,
    }
}

/// Parse CSV content into header-keyed JSON records; bad rows are skipped.
fn parse_csv_records(content: &str) -> Vec<Value> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers = match reader.headers() {
        Ok(headers) => headers.clone(),
        Err(e) => {
            tracing::error!("Bad custodian CSV header: {e}");
            return Vec::new();
        }
    };

    let mut records = Vec::new();
    for result in reader.records() {
        match result {
            Ok(record) => {
                let mut object = serde_json::Map::new();
                for (header, field) in headers.iter().zip(record.iter()) {
                    object.insert(header.to_string(), Value::String(field.to_string()));
                }
                records.push(Value::Object(object));
            }
            Err(e) => tracing::warn!("Skipping malformed custodian CSV row: {e}"),
        }
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use recon_core::ReconConfig;

    #[test]
    fn test_file_window_filter() {
        let from = NaiveDate::from_ymd_opt(2026, 2, 23).unwrap();
        let to = NaiveDate::from_ymd_opt(2026, 2, 24).unwrap();

        assert!(file_date_in_window("trades_20260224.csv", from, to));
        assert!(file_date_in_window("trades_20260223.csv", from, to));
        assert!(!file_date_in_window("trades_20260225.csv", from, to));
        assert!(!file_date_in_window("positions_20260224.csv", from, to));
        assert!(!file_date_in_window("trades_garbage.csv", from, to));
    }

    #[test]
    fn test_parse_and_normalize_custodian_csv() {
        let csv = "TradeID,TradeDate,SettleDate,Symbol,CUSIP,BuySellIndicator,Quantity,Price,GrossAmount,Currency,Counterparty,Account\n\
                   CUS-1,2026-02-24,2026-02-26,aapl,037833100,B,100,199.11,19911.00,USD,Goldman Sachs,ACC-001\n\
                   CUS-2,2026-02-24,2026-02-26,MSFT,594918104,S,50,410.00,20500.00,USD,Morgan Stanley,ACC-002\n";

        let records = parse_csv_records(csv);
        assert_eq!(records.len(), 2);

        let connector = CustodianConnector::new(&ReconConfig::default());
        let first = connector.normalize_trade(&records[0]).unwrap();
        assert_eq!(first.source_trade_id, "CUS-1");
        assert_eq!(first.symbol, "AAPL");
        assert_eq!(first.side, "BUY");
        assert_eq!(first.quantity, 100.0);
        assert_eq!(first.price, 199.11);
        assert_eq!(first.gross_amount, Some(19911.0));
        assert!(first.settlement_date.is_some());
        assert!(connector.validate_trade(&first));

        let second = connector.normalize_trade(&records[1]).unwrap();
        assert_eq!(second.side, "SELL");
    }

    #[tokio::test]
    async fn test_unconfigured_connector_declines() {
        let mut connector = CustodianConnector::new(&ReconConfig::default());
        assert!(!connector.connect().await);
    }
}
