pub mod binance;
pub mod config_store;
pub mod executor;
pub mod ledger;
pub mod lifecycle;
pub mod market_data;

pub use binance::BinanceClient;
pub use config_store::ConfigStore;
pub use executor::ExecutionAdapter;
pub use ledger::{Ledger, TradeSummary};
pub use lifecycle::{CycleOutcome, Engine, EngineHandle, EngineParts};
pub use market_data::{MarketData, MarketPoint};

use sqlx::SqlitePool;

/// Apply the embedded schema migrations.
pub async fn migrate(pool: &SqlitePool) -> common::Result<()> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    Ok(())
}

/// Single-connection in-memory database with the schema applied.
#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    migrate(&pool).await.unwrap();
    pool
}
