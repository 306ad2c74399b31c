use std::time::Duration;

use crate::{Error, Result, TradingMode};

/// Process-level settings loaded from environment variables at startup.
///
/// Strategy parameters are NOT here; they live in the config store and can be
/// replaced at runtime.
#[derive(Debug, Clone)]
pub struct Config {
    // Trading
    pub trading_mode: TradingMode,
    pub symbol: String,
    pub paper_slippage_bps: f64,

    // Exchange
    pub binance_api_key: Option<String>,
    pub binance_secret: Option<String>,
    pub binance_base_url: String,
    pub price_timeout: Duration,
    pub order_timeout: Duration,

    // Dashboard
    pub dashboard_port: u16,

    // Database
    pub database_url: String,

    /// Optional TOML file used to seed the config store on first start.
    pub strategy_config_path: String,
}

impl Config {
    /// Load all configuration from environment variables.
    /// Loads `.env` if present. Live mode requires exchange credentials.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv(); // ignore error if .env not present

        let trading_mode = match optional_env("TRADING_MODE")
            .unwrap_or_else(|| "paper".to_string())
            .to_lowercase()
            .as_str()
        {
            "paper" => TradingMode::Paper,
            "live" => TradingMode::Live,
            other => {
                return Err(Error::Config(format!(
                    "TRADING_MODE must be 'paper' or 'live', got: '{other}'"
                )))
            }
        };

        let binance_api_key = optional_env("BINANCE_API_KEY");
        let binance_secret = optional_env("BINANCE_SECRET");
        if trading_mode == TradingMode::Live
            && (binance_api_key.is_none() || binance_secret.is_none())
        {
            return Err(Error::Config(
                "BINANCE_API_KEY and BINANCE_SECRET are required when TRADING_MODE=live".into(),
            ));
        }

        Ok(Config {
            trading_mode,
            symbol: optional_env("SYMBOL").unwrap_or_else(|| "BTCUSDT".to_string()),
            paper_slippage_bps: parsed_env("PAPER_SLIPPAGE_BPS", 10.0)?,
            binance_api_key,
            binance_secret,
            binance_base_url: optional_env("BINANCE_BASE_URL")
                .unwrap_or_else(|| "https://api.binance.com".to_string()),
            price_timeout: Duration::from_secs(parsed_env("PRICE_TIMEOUT_SECS", 10)?),
            order_timeout: Duration::from_secs(parsed_env("ORDER_TIMEOUT_SECS", 10)?),
            dashboard_port: parsed_env("DASHBOARD_PORT", 8080)?,
            database_url: optional_env("DATABASE_URL")
                .unwrap_or_else(|| "sqlite://pulsebot.db".to_string()),
            strategy_config_path: optional_env("STRATEGY_CONFIG_PATH")
                .unwrap_or_else(|| "config/strategy.toml".to_string()),
        })
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{key} has an invalid value: '{raw}'"))),
        None => Ok(default),
    }
}
