use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use common::{Error, ExchangeClient, Fill, Order, OrderSide, Result};

/// Submits orders decided by the Position Manager to the exchange.
///
/// This is the ONLY component that calls `ExchangeClient::submit_order`.
/// One attempt per call; retrying is left to the next scheduled cycle.
pub struct ExecutionAdapter {
    client: Arc<dyn ExchangeClient>,
    symbol: String,
    timeout: Duration,
}

impl ExecutionAdapter {
    pub fn new(client: Arc<dyn ExchangeClient>, symbol: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            symbol: symbol.into(),
            timeout,
        }
    }

    /// Place a market order and wait for its fill.
    ///
    /// Every failure comes back as either `Error::Transient` or
    /// `Error::Rejected`.
    pub async fn execute(&self, side: OrderSide, quantity: f64) -> Result<Fill> {
        let order = Order::market(&self.symbol, side, quantity);
        info!(pair = %order.pair, side = %side, qty = quantity, id = %order.id, "Executing order");

        let result = match tokio::time::timeout(self.timeout, self.client.submit_order(&order)).await {
            Ok(result) => result.map_err(normalize),
            Err(_) => Err(Error::Transient(format!(
                "order submission timed out after {}s",
                self.timeout.as_secs_f64()
            ))),
        };

        match result {
            Ok(fill) if fill.quantity <= 0.0 => {
                error!(pair = %order.pair, "Order returned an empty fill");
                Err(Error::Rejected(format!("order {} was not filled", order.id)))
            }
            Ok(fill) => {
                if fill.quantity < quantity {
                    warn!(requested = quantity, filled = fill.quantity, "Partial fill");
                }
                info!(pair = %fill.pair, price = fill.fill_price, qty = fill.quantity, "Order filled");
                Ok(fill)
            }
            Err(e) => {
                if e.is_transient() {
                    warn!(pair = %order.pair, error = %e, "Order submission failed");
                } else {
                    error!(pair = %order.pair, error = %e, "Order rejected");
                }
                Err(e)
            }
        }
    }
}

fn normalize(e: Error) -> Error {
    match e {
        Error::Transient(_) | Error::Rejected(_) => e,
        other => Error::Transient(other.to_string()),
    }
}
