//! Position management: the single FLAT/LONG position, stop-loss and
//! take-profit enforcement, and entry sizing.

pub mod manager;

pub use manager::{entry_quantity, Decision, PositionManager};
