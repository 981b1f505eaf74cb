use chrono::{DateTime, Utc};
use recon_core::{BreakHistoryRow, NewTrade, ReconError, Trade, TradeSource};
use sqlx::SqliteConnection;

use crate::db::ReconDb;

/// Persist canonicalized comparison fields inside an open transaction.
pub async fn persist_normalization(
    conn: &mut SqliteConnection,
    trade_id: i64,
    symbol: &str,
    counterparty_normalized: Option<&str>,
) -> Result<(), ReconError> {
    sqlx::query(
        r#"
        UPDATE trades
        SET symbol = ?, counterparty_normalized = COALESCE(?, counterparty_normalized),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(symbol)
    .bind(counterparty_normalized)
    .bind(Utc::now())
    .bind(trade_id)
    .execute(conn)
    .await?;

    Ok(())
}

/// Record one side of a pairing inside an open transaction.
pub async fn set_trade_matched(
    conn: &mut SqliteConnection,
    trade_id: i64,
    matched_trade_id: i64,
    confidence: f64,
) -> Result<(), ReconError> {
    sqlx::query(
        r#"
        UPDATE trades
        SET is_matched = 1, matched_trade_id = ?, match_confidence = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(matched_trade_id)
    .bind(confidence)
    .bind(Utc::now())
    .bind(trade_id)
    .execute(conn)
    .await?;

    Ok(())
}

impl ReconDb {
    /// Insert a trade, deduplicating on `(source_system, source_trade_id)`.
    ///
    /// Returns the new row id, or `None` when the identity already exists;
    /// a concurrent second writer sees a benign duplicate, not an error.
    pub async fn insert_trade(&self, trade: &NewTrade) -> Result<Option<i64>, ReconError> {
        let now = Utc::now();
        let row: Option<(i64,)> = sqlx::query_as(
            r#"
            INSERT OR IGNORE INTO trades
            (source_system, source_trade_id, source_raw_data, trade_date, settlement_date,
             symbol, security_identifier, side, quantity, price, gross_amount, net_amount,
             currency, counterparty, account_number, portfolio, commission, fees,
             ingested_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(trade.source_system)
        .bind(&trade.source_trade_id)
        .bind(&trade.source_raw_data)
        .bind(trade.trade_date)
        .bind(trade.settlement_date)
        .bind(&trade.symbol)
        .bind(&trade.security_identifier)
        .bind(&trade.side)
        .bind(trade.quantity)
        .bind(trade.price)
        .bind(trade.gross_amount)
        .bind(trade.net_amount)
        .bind(&trade.currency)
        .bind(&trade.counterparty)
        .bind(&trade.account_number)
        .bind(&trade.portfolio)
        .bind(trade.commission)
        .bind(trade.fees)
        .bind(now)
        .bind(now)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(|(id,)| id))
    }

    /// Unmatched trades for one source whose trade_date falls inside
    /// `[window_start, window_end)`, in stable load order.
    pub async fn fetch_unmatched_trades(
        &self,
        source: TradeSource,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<Trade>, ReconError> {
        let trades = sqlx::query_as::<_, Trade>(
            r#"
            SELECT * FROM trades
            WHERE source_system = ?
              AND datetime(trade_date) >= datetime(?)
              AND datetime(trade_date) < datetime(?)
              AND is_matched = 0
            ORDER BY id ASC
            "#,
        )
        .bind(source)
        .bind(window_start)
        .bind(window_end)
        .fetch_all(self.pool())
        .await?;

        Ok(trades)
    }

    pub async fn get_trade(&self, id: i64) -> Result<Option<Trade>, ReconError> {
        let trade = sqlx::query_as::<_, Trade>("SELECT * FROM trades WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;

        Ok(trade)
    }

    pub async fn count_trades(&self) -> Result<i64, ReconError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM trades")
            .fetch_one(self.pool())
            .await?;

        Ok(count)
    }

    /// (source, counterparty, broke-or-not) rows backing the break-rate
    /// features of the predictor.
    pub async fn fetch_break_history(&self) -> Result<Vec<BreakHistoryRow>, ReconError> {
        let rows = sqlx::query_as::<_, BreakHistoryRow>(
            r#"
            SELECT t.source_system, t.counterparty,
                   EXISTS(SELECT 1 FROM trade_breaks b WHERE b.trade_id = t.id) AS has_break
            FROM trades t
            "#,
        )
        .fetch_all(self.pool())
        .await?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_trade(source: TradeSource, trade_id: &str) -> NewTrade {
        NewTrade {
            source_system: source,
            source_trade_id: trade_id.to_string(),
            source_raw_data: None,
            trade_date: Utc.with_ymd_and_hms(2026, 2, 24, 14, 30, 0).unwrap(),
            settlement_date: None,
            symbol: "AAPL".to_string(),
            security_identifier: None,
            side: "BUY".to_string(),
            quantity: 100.0,
            price: 200.0,
            gross_amount: None,
            net_amount: None,
            currency: "USD".to_string(),
            counterparty: Some("Goldman Sachs LLC".to_string()),
            account_number: Some("ACC-001".to_string()),
            portfolio: None,
            commission: 0.0,
            fees: 0.0,
        }
    }

    #[tokio::test]
    async fn test_insert_dedup_is_benign() {
        let db = ReconDb::open("sqlite::memory:", 1).await.unwrap();
        let trade = sample_trade(TradeSource::Oms, "OMS-1");

        let first = db.insert_trade(&trade).await.unwrap();
        assert!(first.is_some());

        let second = db.insert_trade(&trade).await.unwrap();
        assert!(second.is_none());

        assert_eq!(db.count_trades().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unmatched_window_filters_by_date_and_source() {
        let db = ReconDb::open("sqlite::memory:", 1).await.unwrap();

        db.insert_trade(&sample_trade(TradeSource::Oms, "OMS-1"))
            .await
            .unwrap();

        let mut outside = sample_trade(TradeSource::Oms, "OMS-2");
        outside.trade_date = Utc.with_ymd_and_hms(2026, 2, 25, 9, 0, 0).unwrap();
        db.insert_trade(&outside).await.unwrap();

        db.insert_trade(&sample_trade(TradeSource::Custodian, "CUS-1"))
            .await
            .unwrap();

        let start = Utc.with_ymd_and_hms(2026, 2, 24, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 2, 25, 0, 0, 0).unwrap();

        let oms = db
            .fetch_unmatched_trades(TradeSource::Oms, start, end)
            .await
            .unwrap();
        assert_eq!(oms.len(), 1);
        assert_eq!(oms[0].source_trade_id, "OMS-1");
    }
}
