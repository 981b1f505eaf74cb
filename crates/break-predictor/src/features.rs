//! Feature extraction for break prediction.

use chrono::{DateTime, Datelike, Timelike, Utc};
use recon_core::BreakHistoryRow;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Gross amount above which a trade counts as high-value.
const HIGH_VALUE_GROSS: f64 = 1_000_000.0;
/// Quantity above which a trade counts as large.
const LARGE_QUANTITY: f64 = 10_000.0;
/// Break rate assumed when no history exists for a source/counterparty.
const NEUTRAL_BREAK_RATE: f64 = 0.5;

/// The fixed feature key set, in extraction order.
pub const FEATURE_NAMES: [&str; 12] = [
    "quantity",
    "price",
    "gross_amount",
    "commission_pct",
    "is_high_value",
    "is_large_quantity",
    "day_of_week",
    "hour_of_day",
    "is_month_end",
    "is_buy",
    "source_break_rate",
    "counterparty_break_rate",
];

/// Loose trade payload accepted by online inference. Fields the caller
/// omits fall back to the same defaults the feature table defines.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TradeFacts {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub gross_amount: Option<f64>,
    #[serde(default)]
    pub commission: Option<f64>,
    #[serde(default)]
    pub trade_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub side: Option<String>,
    #[serde(default)]
    pub source_system: Option<String>,
    #[serde(default)]
    pub counterparty: Option<String>,
}

/// Fixed-key numeric feature map for one trade.
pub fn extract_features(
    trade: &TradeFacts,
    history: &[BreakHistoryRow],
) -> HashMap<String, f64> {
    let mut features = HashMap::new();

    let quantity = trade.quantity.unwrap_or(0.0);
    let price = trade.price.unwrap_or(0.0);
    let gross_amount = trade.gross_amount.unwrap_or(quantity * price);
    let commission = trade.commission.unwrap_or(0.0);

    features.insert("quantity".to_string(), quantity);
    features.insert("price".to_string(), price);
    features.insert("gross_amount".to_string(), gross_amount);
    features.insert(
        "commission_pct".to_string(),
        if gross_amount != 0.0 {
            commission / gross_amount * 100.0
        } else {
            0.0
        },
    );

    features.insert(
        "is_high_value".to_string(),
        (gross_amount > HIGH_VALUE_GROSS) as i32 as f64,
    );
    features.insert(
        "is_large_quantity".to_string(),
        (quantity > LARGE_QUANTITY) as i32 as f64,
    );

    match trade.trade_date {
        Some(dt) => {
            features.insert(
                "day_of_week".to_string(),
                dt.weekday().num_days_from_monday() as f64,
            );
            features.insert("hour_of_day".to_string(), dt.hour() as f64);
            features.insert("is_month_end".to_string(), (dt.day() >= 28) as i32 as f64);
        }
        None => {
            features.insert("day_of_week".to_string(), 0.0);
            features.insert("hour_of_day".to_string(), 12.0);
            features.insert("is_month_end".to_string(), 0.0);
        }
    }

    let is_buy = trade
        .side
        .as_deref()
        .is_some_and(|s| s.eq_ignore_ascii_case("BUY"));
    features.insert("is_buy".to_string(), is_buy as i32 as f64);

    features.insert(
        "source_break_rate".to_string(),
        break_rate(history, |row| {
            trade.source_system.as_deref() == Some(row.source_system.as_str())
        }),
    );
    features.insert(
        "counterparty_break_rate".to_string(),
        break_rate(history, |row| {
            row.counterparty.as_deref() == trade.counterparty.as_deref()
                && trade.counterparty.is_some()
        }),
    );

    features
}

/// Mean of `has_break` over matching history rows; neutral when none match.
fn break_rate<F: Fn(&BreakHistoryRow) -> bool>(history: &[BreakHistoryRow], matches: F) -> f64 {
    let mut hits = 0usize;
    let mut broke = 0usize;
    for row in history.iter().filter(|r| matches(r)) {
        hits += 1;
        if row.has_break {
            broke += 1;
        }
    }
    if hits == 0 {
        NEUTRAL_BREAK_RATE
    } else {
        broke as f64 / hits as f64
    }
}
