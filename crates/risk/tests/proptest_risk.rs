use chrono::Utc;
use common::{Fill, OrderSide, Position, Signal, TradeReason};
use proptest::prelude::*;
use risk::{Decision, PositionManager};
use strategy::StrategyConfig;

fn any_signal() -> impl Strategy<Value = Signal> {
    prop_oneof![Just(Signal::Buy), Just(Signal::Sell), Just(Signal::Hold)]
}

fn fill_for(decision: &Decision, price: f64) -> Option<Fill> {
    decision.side().map(|side| Fill {
        order_id: "prop".into(),
        pair: "TESTUSDT".into(),
        side,
        fill_price: price,
        quantity: decision.quantity(),
        timestamp: Utc::now(),
    })
}

proptest! {
    /// Decisions on randomized prices must never panic and never produce
    /// a BUY while long or a SELL while flat.
    #[test]
    fn never_buys_while_long_or_sells_while_flat(
        steps in prop::collection::vec((1.0f64..1_000_000.0f64, any_signal()), 1..200),
    ) {
        let cfg = StrategyConfig::default();
        let mut pm = PositionManager::flat();
        for (price, signal) in steps {
            let decision = pm.decide(price, signal, &cfg);
            match decision {
                Decision::Enter { quantity } => {
                    prop_assert!(!pm.position().is_long());
                    prop_assert!(quantity > 0.0 && quantity <= cfg.trade_size);
                    prop_assert!(quantity * price <= cfg.position_size_usd * (1.0 + 1e-9));
                }
                Decision::Exit { .. } => prop_assert!(pm.position().is_long()),
                Decision::Hold => {}
            }
            if let Some(fill) = fill_for(&decision, price) {
                pm.apply_fill(&fill, decision.reason(), cfg.trade_size).unwrap();
            }
        }
    }

    /// Once the price breaches the stop-loss level, the decision is a
    /// stop-loss exit whatever the signal says.
    #[test]
    fn stop_loss_beats_any_signal(
        entry in 1.0f64..100_000.0f64,
        drop in 0.0f64..0.5f64,
        stop_loss_pct in 0.005f64..0.10f64,
        signal in any_signal(),
    ) {
        let cfg = StrategyConfig { stop_loss_pct, ..StrategyConfig::default() };
        let pm = PositionManager::new(Position::long(entry, 0.01, Utc::now()));
        let price = entry * (1.0 - stop_loss_pct) * (1.0 - drop);
        let decision = pm.decide(price, signal, &cfg);
        prop_assert_eq!(decision.reason(), TradeReason::StopLoss);
        prop_assert_eq!(decision.side(), Some(OrderSide::Sell));
    }

    /// An inactive configuration never produces an order.
    #[test]
    fn inactive_never_trades(
        long in any::<bool>(),
        entry in 1.0f64..100_000.0f64,
        price in 0.01f64..1_000_000.0f64,
        signal in any_signal(),
    ) {
        let cfg = StrategyConfig { active: false, ..StrategyConfig::default() };
        let pm = if long {
            PositionManager::new(Position::long(entry, 0.01, Utc::now()))
        } else {
            PositionManager::flat()
        };
        prop_assert_eq!(pm.decide(price, signal, &cfg), Decision::Hold);
    }
}
