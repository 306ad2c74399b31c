use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use common::{Error, ExchangeClient, Fill, Order, OrderSide, PriceSource, Result};

/// Simulated exchange client for paper trading.
///
/// Prices come from a real feed; fills are simulated at the latest fetched
/// price with configurable slippage. No real orders are ever sent.
pub struct PaperClient {
    feed: Arc<dyn PriceSource>,
    /// Latest known price per pair, refreshed on every `latest_price` call.
    prices: RwLock<HashMap<String, f64>>,
    /// Slippage in basis points applied to all fills.
    slippage_bps: f64,
}

impl PaperClient {
    pub fn new(feed: Arc<dyn PriceSource>, slippage_bps: f64) -> Self {
        info!(slippage_bps = slippage_bps, "PaperClient initialized");
        Self {
            feed,
            prices: RwLock::new(HashMap::new()),
            slippage_bps,
        }
    }

    /// Seed or override the price for a pair.
    pub async fn update_price(&self, pair: &str, price: f64) {
        self.prices.write().await.insert(pair.to_string(), price);
    }
}

#[async_trait]
impl PriceSource for PaperClient {
    async fn latest_price(&self, symbol: &str) -> Result<f64> {
        let price = self.feed.latest_price(symbol).await?;
        self.update_price(symbol, price).await;
        Ok(price)
    }
}

#[async_trait]
impl ExchangeClient for PaperClient {
    async fn submit_order(&self, order: &Order) -> Result<Fill> {
        let mid_price = self.prices.read().await.get(&order.pair).copied().ok_or_else(|| {
            Error::Transient(format!(
                "PaperClient has no price for pair '{}' yet",
                order.pair
            ))
        })?;

        if !(order.quantity > 0.0) {
            return Err(Error::Rejected(format!("invalid quantity {}", order.quantity)));
        }

        // Buys pay more, sells receive less
        let fill_price = match order.side {
            OrderSide::Buy => mid_price * (1.0 + self.slippage_bps / 10_000.0),
            OrderSide::Sell => mid_price * (1.0 - self.slippage_bps / 10_000.0),
        };

        debug!(
            pair = %order.pair,
            side = %order.side,
            mid = mid_price,
            fill = fill_price,
            qty = order.quantity,
            "Paper fill simulated"
        );

        Ok(Fill {
            order_id: order.id.clone(),
            pair: order.pair.clone(),
            side: order.side,
            fill_price,
            quantity: order.quantity,
            timestamp: Utc::now(),
        })
    }
}
