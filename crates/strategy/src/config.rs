use std::ops::RangeInclusive;
use std::path::Path;

use serde::{Deserialize, Serialize};

use common::{Error, Result};

/// Strategy parameters. Replaced wholesale at a cycle boundary when a valid
/// candidate is saved or reloaded.
///
/// Example seed file `config/strategy.toml`:
/// ```toml
/// trade_size = 0.01
/// stop_loss_pct = 0.02
/// take_profit_pct = 0.025
/// rsi_buy_threshold = 30.0
/// rsi_sell_threshold = 70.0
/// macd_buy_threshold = 0.0
/// macd_sell_threshold = 0.0
/// position_size_usd = 100.0
/// loop_interval_secs = 60
/// indicator_window = 26
/// active = true
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Maximum order quantity in base asset units.
    pub trade_size: f64,
    #[serde(alias = "stop_loss")]
    pub stop_loss_pct: f64,
    #[serde(alias = "stop_profit")]
    pub take_profit_pct: f64,
    pub rsi_buy_threshold: f64,
    pub rsi_sell_threshold: f64,
    /// Minimum MACD histogram for a BUY.
    pub macd_buy_threshold: f64,
    /// Maximum MACD histogram for a SELL.
    pub macd_sell_threshold: f64,
    /// Notional cap per entry in quote currency.
    #[serde(alias = "position_size_usdt")]
    pub position_size_usd: f64,
    #[serde(alias = "loop_interval")]
    pub loop_interval_secs: u64,
    pub indicator_window: u32,
    /// `false` = observation only: indicators keep updating, no orders.
    pub active: bool,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            trade_size: 0.01,
            stop_loss_pct: 0.02,
            take_profit_pct: 0.025,
            rsi_buy_threshold: 30.0,
            rsi_sell_threshold: 70.0,
            macd_buy_threshold: 0.0,
            macd_sell_threshold: 0.0,
            position_size_usd: 100.0,
            loop_interval_secs: 60,
            indicator_window: 26,
            active: true,
        }
    }
}

const TRADE_SIZE: RangeInclusive<f64> = 0.001..=1.0;
const STOP_LOSS: RangeInclusive<f64> = 0.005..=0.10;
const TAKE_PROFIT: RangeInclusive<f64> = 0.005..=0.15;
const RSI_BUY: RangeInclusive<f64> = 10.0..=40.0;
const RSI_SELL: RangeInclusive<f64> = 60.0..=90.0;
const MACD_THRESHOLD: RangeInclusive<f64> = -0.01..=0.01;
const POSITION_SIZE: RangeInclusive<f64> = 10.0..=10_000.0;
pub const MIN_LOOP_INTERVAL_SECS: u64 = 30;
pub const MIN_INDICATOR_WINDOW: u32 = 10;

impl StrategyConfig {
    /// Check every field against its documented bound. Returns all
    /// violations at once; an `Err` means the candidate must not be applied.
    pub fn validate(&self) -> Result<()> {
        let mut violations = Vec::new();

        check_range(&mut violations, "trade_size", self.trade_size, TRADE_SIZE);
        check_range(&mut violations, "stop_loss_pct", self.stop_loss_pct, STOP_LOSS);
        check_range(&mut violations, "take_profit_pct", self.take_profit_pct, TAKE_PROFIT);
        check_range(&mut violations, "rsi_buy_threshold", self.rsi_buy_threshold, RSI_BUY);
        check_range(&mut violations, "rsi_sell_threshold", self.rsi_sell_threshold, RSI_SELL);
        check_range(&mut violations, "macd_buy_threshold", self.macd_buy_threshold, MACD_THRESHOLD);
        check_range(&mut violations, "macd_sell_threshold", self.macd_sell_threshold, MACD_THRESHOLD);
        check_range(&mut violations, "position_size_usd", self.position_size_usd, POSITION_SIZE);

        if self.loop_interval_secs < MIN_LOOP_INTERVAL_SECS {
            violations.push(format!(
                "loop_interval_secs={} is below minimum ({MIN_LOOP_INTERVAL_SECS})",
                self.loop_interval_secs
            ));
        }
        if self.indicator_window < MIN_INDICATOR_WINDOW {
            violations.push(format!(
                "indicator_window={} is below minimum ({MIN_INDICATOR_WINDOW})",
                self.indicator_window
            ));
        }
        if self.rsi_buy_threshold >= self.rsi_sell_threshold {
            violations.push(format!(
                "rsi_buy_threshold ({}) must be less than rsi_sell_threshold ({})",
                self.rsi_buy_threshold, self.rsi_sell_threshold
            ));
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(Error::ConfigValidation(violations))
        }
    }

    /// Non-blocking hints for values that are legal but outside the usual
    /// operating ranges.
    pub fn advisories(&self) -> Vec<String> {
        let mut hints = Vec::new();
        let recommended: [(&str, f64, RangeInclusive<f64>); 9] = [
            ("trade_size", self.trade_size, 0.01..=0.1),
            ("stop_loss_pct", self.stop_loss_pct, 0.01..=0.05),
            ("take_profit_pct", self.take_profit_pct, 0.015..=0.05),
            ("rsi_buy_threshold", self.rsi_buy_threshold, 25.0..=35.0),
            ("rsi_sell_threshold", self.rsi_sell_threshold, 65.0..=80.0),
            ("macd_buy_threshold", self.macd_buy_threshold, -0.001..=0.001),
            ("macd_sell_threshold", self.macd_sell_threshold, -0.001..=0.001),
            ("position_size_usd", self.position_size_usd, 50.0..=500.0),
            ("indicator_window", f64::from(self.indicator_window), 20.0..=30.0),
        ];
        for (name, value, range) in recommended {
            if !range.contains(&value) {
                hints.push(format!(
                    "{name}={value} is outside the recommended range ({}-{})",
                    range.start(),
                    range.end()
                ));
            }
        }
        if !(60..=120).contains(&self.loop_interval_secs) {
            hints.push(format!(
                "loop_interval_secs={} is outside the recommended range (60-120)",
                self.loop_interval_secs
            ));
        }
        if self.stop_loss_pct >= self.take_profit_pct {
            hints.push("stop_loss_pct is not below take_profit_pct".to_string());
        }
        hints
    }

    /// Load a seed config from a TOML file. `Ok(None)` when the file does not
    /// exist; a present but malformed or out-of-range file is an error.
    pub fn load_seed(path: impl AsRef<Path>) -> Result<Option<Self>> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        let cfg: StrategyConfig = toml::from_str(&content).map_err(|e| {
            Error::Config(format!(
                "failed to parse strategy config at '{}': {e}",
                path.display()
            ))
        })?;
        cfg.validate()?;
        Ok(Some(cfg))
    }
}

fn check_range(violations: &mut Vec<String>, name: &str, value: f64, range: RangeInclusive<f64>) {
    if !value.is_finite() {
        violations.push(format!("{name} must be a finite number"));
    } else if value < *range.start() {
        violations.push(format!("{name}={value} is below minimum ({})", range.start()));
    } else if value > *range.end() {
        violations.push(format!("{name}={value} is above maximum ({})", range.end()));
    }
}

/// Indicator periods derived from the single `indicator_window` parameter.
/// Each ratio is truncated, so the default window of 26 yields 14 / 11 / 26 / 9.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorPeriods {
    pub rsi: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub signal: usize,
}

impl IndicatorPeriods {
    pub fn from_window(window: u32) -> Self {
        let w = window as f64;
        Self {
            rsi: ((w * 0.54) as usize).max(10),
            macd_fast: ((w * 0.46) as usize).max(8),
            macd_slow: window as usize,
            signal: ((w * 0.35) as usize).max(6),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn violations(cfg: &StrategyConfig) -> Vec<String> {
        match cfg.validate() {
            Err(Error::ConfigValidation(v)) => v,
            Err(other) => panic!("unexpected error: {other}"),
            Ok(()) => Vec::new(),
        }
    }

    #[test]
    fn defaults_are_valid() {
        assert!(StrategyConfig::default().validate().is_ok());
    }

    #[test]
    fn bounds_are_inclusive() {
        let cfg = StrategyConfig {
            trade_size: 1.0,
            stop_loss_pct: 0.005,
            take_profit_pct: 0.15,
            rsi_buy_threshold: 40.0,
            rsi_sell_threshold: 60.0,
            macd_buy_threshold: -0.01,
            macd_sell_threshold: 0.01,
            loop_interval_secs: 30,
            indicator_window: 10,
            ..StrategyConfig::default()
        };
        assert!(cfg.validate().is_ok(), "{:?}", violations(&cfg));
    }

    #[test]
    fn each_out_of_range_field_is_reported() {
        let cfg = StrategyConfig {
            trade_size: 2.0,
            stop_loss_pct: 0.2,
            take_profit_pct: 0.001,
            macd_buy_threshold: 0.5,
            loop_interval_secs: 5,
            indicator_window: 3,
            ..StrategyConfig::default()
        };
        let v = violations(&cfg);
        assert_eq!(v.len(), 6, "{v:?}");
        assert!(v.iter().any(|m| m.starts_with("trade_size")));
        assert!(v.iter().any(|m| m.starts_with("loop_interval_secs")));
        assert!(v.iter().any(|m| m.starts_with("indicator_window")));
    }

    #[test]
    fn nan_is_rejected() {
        let cfg = StrategyConfig {
            trade_size: f64::NAN,
            ..StrategyConfig::default()
        };
        assert_eq!(violations(&cfg), vec!["trade_size must be a finite number"]);
    }

    #[test]
    fn advisories_never_block_valid_config() {
        let cfg = StrategyConfig {
            stop_loss_pct: 0.05,
            take_profit_pct: 0.02,
            ..StrategyConfig::default()
        };
        assert!(cfg.validate().is_ok());
        assert!(cfg
            .advisories()
            .iter()
            .any(|a| a.contains("stop_loss_pct is not below")));
    }

    #[test]
    fn legacy_field_names_are_accepted() {
        let json = r#"{
            "trade_size": 0.02, "stop_loss": 0.03, "stop_profit": 0.04,
            "rsi_buy_threshold": 25, "rsi_sell_threshold": 75,
            "macd_buy_threshold": 0.0, "macd_sell_threshold": 0.0,
            "position_size_usdt": 200.0, "loop_interval": 90,
            "indicator_window": 20, "active": false
        }"#;
        let cfg: StrategyConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.stop_loss_pct, 0.03);
        assert_eq!(cfg.take_profit_pct, 0.04);
        assert_eq!(cfg.position_size_usd, 200.0);
        assert_eq!(cfg.loop_interval_secs, 90);
        assert!(!cfg.active);
    }

    #[test]
    fn default_window_derives_standard_periods() {
        let p = IndicatorPeriods::from_window(26);
        assert_eq!((p.rsi, p.macd_fast, p.macd_slow, p.signal), (14, 11, 26, 9));
    }

    #[test]
    fn derived_periods_truncate() {
        // 25 * 0.35 = 8.75 and 40 * 0.46 = 18.4
        assert_eq!(IndicatorPeriods::from_window(25).signal, 8);
        assert_eq!(IndicatorPeriods::from_window(40).macd_fast, 18);
        assert_eq!(IndicatorPeriods::from_window(29).rsi, 15);
    }

    #[test]
    fn small_window_respects_period_floors() {
        let p = IndicatorPeriods::from_window(10);
        assert_eq!((p.rsi, p.macd_fast, p.macd_slow, p.signal), (10, 8, 10, 6));
    }

    #[test]
    fn seed_file_round_trips_through_toml() {
        let dir = std::env::temp_dir().join(format!("seed-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("strategy.toml");
        let cfg = StrategyConfig {
            indicator_window: 20,
            ..StrategyConfig::default()
        };
        std::fs::write(&path, toml::to_string(&cfg).unwrap()).unwrap();

        let loaded = StrategyConfig::load_seed(&path).unwrap();
        assert_eq!(loaded, Some(cfg));
        assert_eq!(StrategyConfig::load_seed(dir.join("missing.toml")).unwrap(), None);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
