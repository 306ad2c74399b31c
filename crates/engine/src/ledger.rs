use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use common::{Error, OrderSide, Result, TradeReason, TradeRecord};

/// Append-only history of executed orders, backed by the `trades` table.
#[derive(Clone)]
pub struct Ledger {
    pool: SqlitePool,
}

/// Trade counts, most useful to the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TradeSummary {
    pub total_trades: i64,
    pub buy_trades: i64,
    pub sell_trades: i64,
}

#[derive(sqlx::FromRow)]
struct TradeRow {
    timestamp: String,
    side: OrderSide,
    price: f64,
    quantity: f64,
    trade_size: f64,
    reason: TradeReason,
}

impl TryFrom<TradeRow> for TradeRecord {
    type Error = Error;

    fn try_from(row: TradeRow) -> Result<Self> {
        let timestamp = DateTime::parse_from_rfc3339(&row.timestamp)
            .map_err(|e| Error::Storage(format!("bad trade timestamp '{}': {e}", row.timestamp)))?
            .with_timezone(&Utc);
        Ok(TradeRecord {
            timestamp,
            side: row.side,
            price: row.price,
            quantity: row.quantity,
            trade_size: row.trade_size,
            reason: row.reason,
        })
    }
}

impl Ledger {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn append(&self, record: &TradeRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO trades (timestamp, side, price, quantity, trade_size, reason)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(record.timestamp.to_rfc3339())
        .bind(record.side)
        .bind(record.price)
        .bind(record.quantity)
        .bind(record.trade_size)
        .bind(record.reason)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Most-recent-first page of the history.
    pub async fn list(&self, limit: u32, offset: u32) -> Result<Vec<TradeRecord>> {
        let rows: Vec<TradeRow> = sqlx::query_as(
            r#"
            SELECT timestamp, side, price, quantity, trade_size, reason
            FROM trades
            ORDER BY id DESC
            LIMIT ?1 OFFSET ?2
            "#,
        )
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TradeRecord::try_from).collect()
    }

    /// Full history, oldest first. Used to rebuild the position at startup.
    pub async fn chronological(&self) -> Result<Vec<TradeRecord>> {
        let rows: Vec<TradeRow> = sqlx::query_as(
            "SELECT timestamp, side, price, quantity, trade_size, reason FROM trades ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TradeRecord::try_from).collect()
    }

    pub async fn summary(&self) -> Result<TradeSummary> {
        let (total_trades, buy_trades, sell_trades): (i64, i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*),
                   COALESCE(SUM(CASE WHEN side = 'BUY' THEN 1 ELSE 0 END), 0),
                   COALESCE(SUM(CASE WHEN side = 'SELL' THEN 1 ELSE 0 END), 0)
            FROM trades
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(TradeSummary {
            total_trades,
            buy_trades,
            sell_trades,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(side: OrderSide, price: f64, at: DateTime<Utc>) -> TradeRecord {
        TradeRecord {
            timestamp: at,
            side,
            price,
            quantity: 0.01,
            trade_size: 0.01,
            reason: TradeReason::Signal,
        }
    }

    #[tokio::test]
    async fn list_is_most_recent_first() {
        let ledger = Ledger::new(crate::test_pool().await);
        let t0 = Utc::now();
        ledger.append(&record(OrderSide::Buy, 100.0, t0)).await.unwrap();
        ledger
            .append(&record(OrderSide::Sell, 103.0, t0 + Duration::seconds(60)))
            .await
            .unwrap();
        ledger
            .append(&record(OrderSide::Buy, 101.0, t0 + Duration::seconds(120)))
            .await
            .unwrap();

        let page = ledger.list(10, 0).await.unwrap();
        let prices: Vec<f64> = page.iter().map(|r| r.price).collect();
        assert_eq!(prices, vec![101.0, 103.0, 100.0]);

        let second = ledger.list(2, 2).await.unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].price, 100.0);

        let replay = ledger.chronological().await.unwrap();
        assert_eq!(replay.first().unwrap().price, 100.0);
    }

    #[tokio::test]
    async fn records_round_trip_with_reason() {
        let ledger = Ledger::new(crate::test_pool().await);
        let mut rec = record(OrderSide::Sell, 97.0, Utc::now());
        rec.reason = TradeReason::StopLoss;
        ledger.append(&rec).await.unwrap();

        let stored = ledger.list(1, 0).await.unwrap().remove(0);
        assert_eq!(stored.reason, TradeReason::StopLoss);
        assert_eq!(stored.side, OrderSide::Sell);
        assert_eq!(stored.timestamp.timestamp_millis(), rec.timestamp.timestamp_millis());
    }

    #[tokio::test]
    async fn summary_counts_sides() {
        let ledger = Ledger::new(crate::test_pool().await);
        assert_eq!(ledger.summary().await.unwrap(), TradeSummary::default());

        let now = Utc::now();
        ledger.append(&record(OrderSide::Buy, 1.0, now)).await.unwrap();
        ledger.append(&record(OrderSide::Sell, 1.0, now)).await.unwrap();
        ledger.append(&record(OrderSide::Buy, 1.0, now)).await.unwrap();

        let s = ledger.summary().await.unwrap();
        assert_eq!((s.total_trades, s.buy_trades, s.sell_trades), (3, 2, 1));
    }
}
