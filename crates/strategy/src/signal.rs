use common::{IndicatorState, Signal};

use crate::config::StrategyConfig;

/// Map indicator readings to a trade signal.
///
/// BUY needs RSI at or below the buy threshold AND the MACD histogram at or
/// above the MACD buy threshold; SELL mirrors it. Unavailable indicators
/// always yield `Hold`.
pub fn evaluate(state: &IndicatorState, config: &StrategyConfig) -> Signal {
    let (Some(rsi), Some(histogram)) = (state.rsi, state.macd_histogram) else {
        return Signal::Hold;
    };

    if rsi <= config.rsi_buy_threshold && histogram >= config.macd_buy_threshold {
        Signal::Buy
    } else if rsi >= config.rsi_sell_threshold && histogram <= config.macd_sell_threshold {
        Signal::Sell
    } else {
        Signal::Hold
    }
}
