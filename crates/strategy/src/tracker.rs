use common::IndicatorState;

use crate::config::IndicatorPeriods;
use crate::indicators::{Macd, Rsi};

/// Maintains MACD and RSI incrementally from a stream of prices and exposes
/// them once `indicator_window` samples have been seen.
///
/// Each `update` is O(1); the tracker never stores raw prices.
#[derive(Debug, Clone)]
pub struct IndicatorTracker {
    window: u32,
    periods: IndicatorPeriods,
    macd: Macd,
    rsi: Rsi,
    state: IndicatorState,
}

impl IndicatorTracker {
    pub fn new(indicator_window: u32) -> Self {
        let periods = IndicatorPeriods::from_window(indicator_window);
        Self {
            window: indicator_window,
            periods,
            macd: Macd::new(periods.macd_fast, periods.macd_slow, periods.signal),
            rsi: Rsi::new(periods.rsi),
            state: IndicatorState::default(),
        }
    }

    pub fn window(&self) -> u32 {
        self.window
    }

    pub fn periods(&self) -> IndicatorPeriods {
        self.periods
    }

    /// True while fewer than `indicator_window` samples have been seen.
    pub fn is_collecting(&self) -> bool {
        self.state.sample_count < u64::from(self.window)
    }

    /// Fold one price in and return the new indicator state.
    pub fn update(&mut self, price: f64) -> IndicatorState {
        let reading = self.macd.update(price);
        let rsi = self.rsi.update(price);
        let sample_count = self.state.sample_count + 1;

        self.state = if sample_count >= u64::from(self.window) {
            IndicatorState {
                short_ema: Some(reading.fast_ema),
                long_ema: Some(reading.slow_ema),
                macd_line: Some(reading.macd),
                signal_line: Some(reading.signal),
                macd_histogram: Some(reading.histogram),
                rsi,
                sample_count,
            }
        } else {
            IndicatorState {
                sample_count,
                ..IndicatorState::default()
            }
        };
        self.state
    }
}
