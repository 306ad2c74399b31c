use async_trait::async_trait;

use crate::{Fill, Order, Result};

/// Source of the latest traded price for a symbol.
///
/// Implementations may fail transiently; callers treat any error as a
/// skipped cycle, never as fatal.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn latest_price(&self, symbol: &str) -> Result<f64>;
}

/// Abstraction over the order execution endpoint.
///
/// `BinanceClient` implements this for live trading.
/// `PaperClient` implements this for simulation.
///
/// Only `ExecutionAdapter` in `crates/engine` should hold a reference to a
/// `dyn ExchangeClient`. All order flow goes through the Position Manager
/// before reaching the adapter.
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    /// Submit a market order and return the fill confirmation.
    ///
    /// Errors must be `Error::Transient` or `Error::Rejected`.
    async fn submit_order(&self, order: &Order) -> Result<Fill>;
}
