use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One price observation pulled from the market data source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceSample {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
}

impl PriceSample {
    pub fn now(price: f64) -> Self {
        Self {
            timestamp: Utc::now(),
            price,
        }
    }
}

/// Side of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "TEXT", rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

/// A market order to be submitted to the exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub pair: String,
    pub side: OrderSide,
    pub quantity: f64,
}

impl Order {
    pub fn market(pair: impl Into<String>, side: OrderSide, quantity: f64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            pair: pair.into(),
            side,
            quantity,
        }
    }
}

/// Confirmation of a filled order returned by the exchange.
/// `quantity` may be lower than requested on a partial fill.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fill {
    pub order_id: String,
    pub pair: String,
    pub side: OrderSide,
    pub fill_price: f64,
    pub quantity: f64,
    pub timestamp: DateTime<Utc>,
}

/// Discrete output of the signal generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Signal {
    Buy,
    Sell,
    #[default]
    Hold,
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Signal::Buy => write!(f, "BUY"),
            Signal::Sell => write!(f, "SELL"),
            Signal::Hold => write!(f, "HOLD"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum PositionState {
    #[default]
    Flat,
    Long,
}

impl std::fmt::Display for PositionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PositionState::Flat => write!(f, "FLAT"),
            PositionState::Long => write!(f, "LONG"),
        }
    }
}

/// The single position the engine may hold. When `state` is `Flat` the
/// remaining fields are zero / `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Position {
    pub state: PositionState,
    pub entry_price: f64,
    pub quantity: f64,
    pub entry_timestamp: Option<DateTime<Utc>>,
}

impl Position {
    pub fn flat() -> Self {
        Self::default()
    }

    pub fn long(entry_price: f64, quantity: f64, entry_timestamp: DateTime<Utc>) -> Self {
        Self {
            state: PositionState::Long,
            entry_price,
            quantity,
            entry_timestamp: Some(entry_timestamp),
        }
    }

    pub fn is_long(&self) -> bool {
        self.state == PositionState::Long
    }

    /// Unrealized PnL in percent at `price`, `None` when flat.
    pub fn unrealized_pnl_pct(&self, price: f64) -> Option<f64> {
        if !self.is_long() || self.entry_price <= 0.0 {
            return None;
        }
        Some((price - self.entry_price) / self.entry_price * 100.0)
    }
}

/// Why an order was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
pub enum TradeReason {
    Signal,
    StopLoss,
    TakeProfit,
}

impl std::fmt::Display for TradeReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeReason::Signal => write!(f, "signal"),
            TradeReason::StopLoss => write!(f, "stop_loss"),
            TradeReason::TakeProfit => write!(f, "take_profit"),
        }
    }
}

/// One executed order, as written to the history ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub timestamp: DateTime<Utc>,
    pub side: OrderSide,
    pub price: f64,
    pub quantity: f64,
    /// `trade_size` parameter in effect when the order was placed.
    pub trade_size: f64,
    pub reason: TradeReason,
}

impl TradeRecord {
    pub fn notional(&self) -> f64 {
        self.price * self.quantity
    }
}

/// Indicator readings after the latest sample. Every value is `None` until
/// the tracker has seen `indicator_window` samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct IndicatorState {
    pub short_ema: Option<f64>,
    pub long_ema: Option<f64>,
    pub macd_line: Option<f64>,
    pub signal_line: Option<f64>,
    pub macd_histogram: Option<f64>,
    pub rsi: Option<f64>,
    pub sample_count: u64,
}

impl IndicatorState {
    pub fn is_ready(&self) -> bool {
        self.rsi.is_some() && self.macd_histogram.is_some()
    }
}

/// Whether the bot is running against the real exchange or simulating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradingMode {
    Live,
    Paper,
}

impl std::fmt::Display for TradingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradingMode::Live => write!(f, "live"),
            TradingMode::Paper => write!(f, "paper"),
        }
    }
}

/// Current state of the control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EngineState {
    #[default]
    Stopped,
    Running,
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineState::Stopped => write!(f, "stopped"),
            EngineState::Running => write!(f, "running"),
        }
    }
}

/// Read-only snapshot published after every cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EngineStatus {
    pub status: EngineState,
    pub symbol: String,
    pub collecting: bool,
    pub last_price: Option<f64>,
    pub indicators: IndicatorState,
    pub position: Position,
    pub unrealized_pnl_pct: Option<f64>,
    pub last_signal: Signal,
    pub last_error: Option<String>,
    /// Executed trades still waiting to be written to the history.
    pub unrecorded_trades: usize,
    pub cycle_count: u64,
    pub updated_at: Option<DateTime<Utc>>,
}

impl EngineStatus {
    pub fn new(symbol: impl Into<String>, position: Position) -> Self {
        Self {
            symbol: symbol.into(),
            collecting: true,
            position,
            ..Self::default()
        }
    }
}
