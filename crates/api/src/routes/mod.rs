mod control;
mod health;
mod history;
mod market;

pub use control::control_router;
pub use health::health_router;
pub use history::history_router;
pub use market::market_router;
