use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use common::{Error, IndicatorState, PriceSample, Result};

/// Append-only record of fetched prices for one symbol, each stored with the
/// indicator readings it produced. Backed by the `price_samples` table.
#[derive(Clone)]
pub struct MarketData {
    pool: SqlitePool,
    symbol: String,
}

/// One stored sample. Indicator fields are `None` for samples taken while
/// the tracker was still collecting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketPoint {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub short_ema: Option<f64>,
    pub long_ema: Option<f64>,
    pub macd_line: Option<f64>,
    pub signal_line: Option<f64>,
    pub macd_histogram: Option<f64>,
    pub rsi: Option<f64>,
}

#[derive(sqlx::FromRow)]
struct PointRow {
    timestamp: String,
    price: f64,
    short_ema: Option<f64>,
    long_ema: Option<f64>,
    macd_line: Option<f64>,
    signal_line: Option<f64>,
    macd_histogram: Option<f64>,
    rsi: Option<f64>,
}

impl TryFrom<PointRow> for MarketPoint {
    type Error = Error;

    fn try_from(row: PointRow) -> Result<Self> {
        let timestamp = DateTime::parse_from_rfc3339(&row.timestamp)
            .map_err(|e| Error::Storage(format!("bad sample timestamp '{}': {e}", row.timestamp)))?
            .with_timezone(&Utc);
        Ok(MarketPoint {
            timestamp,
            price: row.price,
            short_ema: row.short_ema,
            long_ema: row.long_ema,
            macd_line: row.macd_line,
            signal_line: row.signal_line,
            macd_histogram: row.macd_histogram,
            rsi: row.rsi,
        })
    }
}

impl MarketData {
    pub fn new(pool: SqlitePool, symbol: impl Into<String>) -> Self {
        Self {
            pool,
            symbol: symbol.into(),
        }
    }

    pub async fn append(&self, sample: &PriceSample, indicators: &IndicatorState) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO price_samples
                (symbol, timestamp, price, short_ema, long_ema, macd_line, signal_line, macd_histogram, rsi)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&self.symbol)
        .bind(sample.timestamp.to_rfc3339())
        .bind(sample.price)
        .bind(indicators.short_ema)
        .bind(indicators.long_ema)
        .bind(indicators.macd_line)
        .bind(indicators.signal_line)
        .bind(indicators.macd_histogram)
        .bind(indicators.rsi)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// The last `limit` samples, oldest first.
    pub async fn recent(&self, limit: u32) -> Result<Vec<MarketPoint>> {
        let rows: Vec<PointRow> = sqlx::query_as(
            r#"
            SELECT timestamp, price, short_ema, long_ema, macd_line, signal_line, macd_histogram, rsi
            FROM price_samples
            WHERE symbol = ?1
            ORDER BY id DESC
            LIMIT ?2
            "#,
        )
        .bind(&self.symbol)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .rev()
            .map(MarketPoint::try_from)
            .collect()
    }

    pub async fn count(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM price_samples WHERE symbol = ?1")
            .bind(&self.symbol)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
