use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use common::{Error, Fill, OrderSide, Position, Result, Signal, TradeReason, TradeRecord};
use strategy::StrategyConfig;

/// Fills smaller than this are treated as "nothing left".
const QTY_EPSILON: f64 = 1e-12;

/// What the position manager wants done this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Decision {
    Hold,
    Enter { quantity: f64 },
    Exit { quantity: f64, reason: TradeReason },
}

impl Decision {
    pub fn side(&self) -> Option<OrderSide> {
        match self {
            Decision::Hold => None,
            Decision::Enter { .. } => Some(OrderSide::Buy),
            Decision::Exit { .. } => Some(OrderSide::Sell),
        }
    }

    pub fn quantity(&self) -> f64 {
        match *self {
            Decision::Hold => 0.0,
            Decision::Enter { quantity } | Decision::Exit { quantity, .. } => quantity,
        }
    }

    pub fn reason(&self) -> TradeReason {
        match *self {
            Decision::Exit { reason, .. } => reason,
            _ => TradeReason::Signal,
        }
    }
}

/// The gatekeeper between the signal generator and the execution adapter.
///
/// Owns the single [`Position`]. `decide` is side-effect free; the position
/// only changes in `apply_fill`, after the exchange has confirmed the order.
#[derive(Debug, Clone, Default)]
pub struct PositionManager {
    position: Position,
}

impl PositionManager {
    pub fn new(position: Position) -> Self {
        Self { position }
    }

    pub fn flat() -> Self {
        Self::default()
    }

    /// Rebuild the position by replaying executed trades oldest-first.
    pub fn from_history(trades: &[TradeRecord]) -> Self {
        let mut manager = Self::flat();
        for trade in trades {
            manager.replay(trade);
        }
        if manager.position.is_long() {
            info!(
                entry_price = manager.position.entry_price,
                quantity = manager.position.quantity,
                "Recovered open position from trade history"
            );
        }
        manager
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    /// Decide what to do at `price` given the latest signal.
    ///
    /// Priority: inactive config, stop-loss, take-profit, then the signal.
    /// A BUY is only honoured while flat and a SELL only while long.
    pub fn decide(&self, price: f64, signal: Signal, config: &StrategyConfig) -> Decision {
        if !config.active {
            return Decision::Hold;
        }

        if self.position.is_long() {
            let entry = self.position.entry_price;
            let quantity = self.position.quantity;

            if price <= entry * (1.0 - config.stop_loss_pct) {
                info!(price, entry, "Stop-loss triggered");
                return Decision::Exit {
                    quantity,
                    reason: TradeReason::StopLoss,
                };
            }
            if price >= entry * (1.0 + config.take_profit_pct) {
                info!(price, entry, "Take-profit triggered");
                return Decision::Exit {
                    quantity,
                    reason: TradeReason::TakeProfit,
                };
            }
        }

        match (signal, self.position.is_long()) {
            (Signal::Buy, false) => {
                let quantity = entry_quantity(price, config);
                if quantity > 0.0 {
                    Decision::Enter { quantity }
                } else {
                    Decision::Hold
                }
            }
            (Signal::Sell, true) => Decision::Exit {
                quantity: self.position.quantity,
                reason: TradeReason::Signal,
            },
            _ => Decision::Hold,
        }
    }

    /// Apply a confirmed fill and produce the record to append to the ledger.
    ///
    /// A zero fill is a rejection and leaves the position untouched.
    pub fn apply_fill(&mut self, fill: &Fill, reason: TradeReason, trade_size: f64) -> Result<TradeRecord> {
        if !(fill.quantity > QTY_EPSILON) || !fill.fill_price.is_finite() || fill.fill_price <= 0.0 {
            return Err(Error::Rejected(format!(
                "order {} filled {} @ {}",
                fill.order_id, fill.quantity, fill.fill_price
            )));
        }

        let record = TradeRecord {
            timestamp: fill.timestamp,
            side: fill.side,
            price: fill.fill_price,
            quantity: fill.quantity,
            trade_size,
            reason,
        };
        self.replay(&record);
        Ok(record)
    }

    fn replay(&mut self, trade: &TradeRecord) {
        match trade.side {
            OrderSide::Buy => {
                if self.position.is_long() {
                    warn!(price = trade.price, "BUY while already long, replacing position");
                }
                self.position = Position::long(trade.price, trade.quantity, trade.timestamp);
            }
            OrderSide::Sell => {
                let remaining = self.position.quantity - trade.quantity;
                if remaining > QTY_EPSILON && self.position.is_long() {
                    info!(remaining, "Partial exit, position stays long");
                    self.position.quantity = remaining;
                } else {
                    self.position = Position::flat();
                }
            }
        }
    }
}

/// `min(trade_size, position_size_usd / price)`
pub fn entry_quantity(price: f64, config: &StrategyConfig) -> f64 {
    if !(price > 0.0) || !price.is_finite() {
        return 0.0;
    }
    config.trade_size.min(config.position_size_usd / price)
}
