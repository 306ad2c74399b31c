//! Indicator tracking and signal evaluation.
//!
//! The strategy layer is pure: it folds prices into [`IndicatorState`] and
//! maps that state to a [`Signal`] under a [`StrategyConfig`]. It never talks
//! to the exchange or the database.
//!
//! [`IndicatorState`]: common::IndicatorState
//! [`Signal`]: common::Signal

pub mod config;
pub mod indicators;
pub mod signal;
pub mod tracker;

pub use config::{IndicatorPeriods, StrategyConfig, MIN_INDICATOR_WINDOW, MIN_LOOP_INTERVAL_SECS};
pub use signal::evaluate;
pub use tracker::IndicatorTracker;
