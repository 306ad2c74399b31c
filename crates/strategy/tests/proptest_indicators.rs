use proptest::prelude::*;
use strategy::{evaluate, IndicatorTracker, StrategyConfig};

proptest! {
    /// RSI stays inside [0, 100] for any positive price series.
    #[test]
    fn rsi_is_bounded(prices in prop::collection::vec(0.01f64..1_000_000.0f64, 10..200)) {
        let mut tracker = IndicatorTracker::new(10);
        for p in prices {
            let state = tracker.update(p);
            if let Some(rsi) = state.rsi {
                prop_assert!((0.0..=100.0).contains(&rsi), "rsi {rsi}");
            }
        }
    }

    /// Indicators appear exactly when the sample count reaches the window.
    #[test]
    fn readiness_tracks_window(
        window in 10u32..60,
        prices in prop::collection::vec(1.0f64..100_000.0f64, 1..120),
    ) {
        let mut tracker = IndicatorTracker::new(window);
        for p in prices {
            let state = tracker.update(p);
            prop_assert_eq!(state.is_ready(), state.sample_count >= u64::from(window));
        }
    }

    /// Signal evaluation never panics and never emits BUY and SELL conditions
    /// at once under a valid configuration.
    #[test]
    fn signal_is_consistent_with_thresholds(
        prices in prop::collection::vec(1.0f64..100_000.0f64, 30..100),
    ) {
        let cfg = StrategyConfig::default();
        let mut tracker = IndicatorTracker::new(cfg.indicator_window);
        for p in prices {
            let state = tracker.update(p);
            let signal = evaluate(&state, &cfg);
            if let (Some(rsi), Some(hist)) = (state.rsi, state.macd_histogram) {
                match signal {
                    common::Signal::Buy => {
                        prop_assert!(rsi <= cfg.rsi_buy_threshold && hist >= cfg.macd_buy_threshold)
                    }
                    common::Signal::Sell => {
                        prop_assert!(rsi >= cfg.rsi_sell_threshold && hist <= cfg.macd_sell_threshold)
                    }
                    common::Signal::Hold => {}
                }
            } else {
                prop_assert_eq!(signal, common::Signal::Hold);
            }
        }
    }
}
