//! Seed a pair of demo trades for local exploration: the same AAPL fill as
//! seen by the OMS and by the custodian, one cent apart on price.
//!
//! Usage:
//!   cargo run -p seed-data

use anyhow::Result;
use chrono::Utc;
use recon_core::{NewTrade, ReconConfig, TradeSource};
use recon_store::ReconDb;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = ReconConfig::from_env()?;
    let db = ReconDb::connect(&config).await?;

    let now = Utc::now();
    let seed_trades = [
        NewTrade {
            source_system: TradeSource::Oms,
            source_trade_id: "OMS_DEMO_001".to_string(),
            source_raw_data: None,
            trade_date: now,
            settlement_date: None,
            symbol: "AAPL".to_string(),
            security_identifier: None,
            side: "BUY".to_string(),
            quantity: 150.0,
            price: 199.10,
            gross_amount: None,
            net_amount: None,
            currency: "USD".to_string(),
            counterparty: Some("Goldman Sachs LLC".to_string()),
            account_number: Some("ACC-001".to_string()),
            portfolio: None,
            commission: 0.0,
            fees: 0.0,
        },
        NewTrade {
            source_system: TradeSource::Custodian,
            source_trade_id: "CUS_DEMO_001".to_string(),
            source_raw_data: None,
            trade_date: now,
            settlement_date: None,
            symbol: "AAPL".to_string(),
            security_identifier: None,
            side: "BUY".to_string(),
            quantity: 150.0,
            price: 199.11,
            gross_amount: None,
            net_amount: None,
            currency: "USD".to_string(),
            counterparty: Some("Goldman Sachs".to_string()),
            account_number: Some("ACC-001".to_string()),
            portfolio: None,
            commission: 0.0,
            fees: 0.0,
        },
    ];

    let mut seeded = 0usize;
    for trade in &seed_trades {
        if db.insert_trade(trade).await?.is_some() {
            seeded += 1;
        }
    }

    println!("Seeded {seeded} demo trades ({} already present)", seed_trades.len() - seeded);
    Ok(())
}
