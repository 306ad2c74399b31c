pub mod rest;

pub use rest::{BinanceClient, DEFAULT_BASE_URL};
