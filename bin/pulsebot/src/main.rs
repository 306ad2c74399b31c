use std::str::FromStr;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use common::{Config, ExchangeClient, PriceSource, TradingMode};
use engine::{BinanceClient, ConfigStore, Engine, EngineParts, ExecutionAdapter, Ledger, MarketData};
use paper::PaperClient;
use risk::PositionManager;
use strategy::StrategyConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env().context("invalid environment configuration")?;
    info!(mode = %cfg.trading_mode, symbol = %cfg.symbol, "PulseBot starting");

    // ── Database ──────────────────────────────────────────────────────────────
    let options = SqliteConnectOptions::from_str(&cfg.database_url)
        .with_context(|| format!("invalid DATABASE_URL '{}'", cfg.database_url))?
        .create_if_missing(true);
    let db = SqlitePool::connect_with(options)
        .await
        .context("failed to connect to database")?;
    engine::migrate(&db).await.context("database migration failed")?;
    info!("Database ready");

    // ── Strategy config ───────────────────────────────────────────────────────
    let store = ConfigStore::new(db.clone());
    let strategy_config = load_strategy_config(&store, &cfg.strategy_config_path).await?;
    for hint in strategy_config.advisories() {
        warn!(advisory = %hint, "Strategy config advisory");
    }

    // ── Position recovery ─────────────────────────────────────────────────────
    let ledger = Ledger::new(db.clone());
    let history = ledger
        .chronological()
        .await
        .context("failed to read trade history")?;
    let positions = PositionManager::from_history(&history);
    info!(trades = history.len(), position = ?positions.position().state, "Trade history loaded");

    // ── Exchange clients (injected based on TRADING_MODE) ─────────────────────
    let (price_source, exchange): (Arc<dyn PriceSource>, Arc<dyn ExchangeClient>) =
        match cfg.trading_mode {
            TradingMode::Live => {
                let key = cfg.binance_api_key.clone().ok_or_else(|| anyhow!("BINANCE_API_KEY missing"))?;
                let secret = cfg.binance_secret.clone().ok_or_else(|| anyhow!("BINANCE_SECRET missing"))?;
                info!("Live trading mode: using BinanceClient");
                let client = Arc::new(BinanceClient::new(key, secret, &cfg.binance_base_url)?);
                (client.clone(), client)
            }
            TradingMode::Paper => {
                info!(slippage_bps = cfg.paper_slippage_bps, "Paper trading mode: using PaperClient");
                // Public ticker endpoint needs no credentials.
                let feed = Arc::new(BinanceClient::new(
                    cfg.binance_api_key.clone().unwrap_or_default(),
                    cfg.binance_secret.clone().unwrap_or_default(),
                    &cfg.binance_base_url,
                )?);
                let client = Arc::new(PaperClient::new(feed, cfg.paper_slippage_bps));
                (client.clone(), client)
            }
        };

    // ── Engine ────────────────────────────────────────────────────────────────
    let market_data = MarketData::new(db.clone(), &cfg.symbol);
    let (mut engine, handle) = Engine::new(EngineParts {
        symbol: cfg.symbol.clone(),
        config: strategy_config,
        positions,
        price_source,
        executor: ExecutionAdapter::new(exchange, &cfg.symbol, cfg.order_timeout),
        ledger: ledger.clone(),
        market_data: market_data.clone(),
        store,
        price_timeout: cfg.price_timeout,
    });
    if let Err(e) = engine.warm_up().await {
        warn!(error = %e, "Could not replay stored price samples, starting cold");
    }

    // ── Dashboard API ─────────────────────────────────────────────────────────
    let api_state = api::AppState {
        handle: handle.clone(),
        ledger,
        market_data,
        trading_mode: cfg.trading_mode,
    };
    let shutdown = handle.cancellation_token();

    let engine_task = tokio::spawn(engine.run());
    let mut server = tokio::spawn(api::serve(api_state, cfg.dashboard_port, shutdown.clone()));

    info!("All subsystems started. Waiting for shutdown signal.");
    let server_exit = tokio::select! {
        res = tokio::signal::ctrl_c() => {
            if let Err(e) = res {
                error!(error = %e, "Failed to listen for shutdown signal");
            }
            info!("Shutdown signal received");
            None
        }
        _ = shutdown.cancelled() => None,
        res = &mut server => Some(res),
    };
    handle.stop();

    engine_task.await.context("control loop panicked")?;
    let server_result = match server_exit {
        Some(res) => res,
        None => server.await,
    };
    server_result
        .context("API server panicked")?
        .context("API server failed")?;
    db.close().await;
    info!("PulseBot stopped");
    Ok(())
}

/// Stored config wins; on first start the store is seeded from the TOML file
/// if present, else from defaults. Anything malformed is fatal.
async fn load_strategy_config(store: &ConfigStore, seed_path: &str) -> anyhow::Result<StrategyConfig> {
    if let Some(stored) = store
        .load()
        .await
        .context("persisted strategy config is invalid")?
    {
        info!("Strategy config loaded from store");
        return Ok(stored);
    }

    let seed = match StrategyConfig::load_seed(seed_path)
        .with_context(|| format!("invalid strategy seed file '{seed_path}'"))?
    {
        Some(cfg) => {
            info!(path = %seed_path, "Seeding strategy config from file");
            cfg
        }
        None => {
            info!("No stored or seed strategy config, using defaults");
            StrategyConfig::default()
        }
    };
    store.save(&seed).await.context("failed to persist strategy config")?;
    Ok(seed)
}
