// mise/src/orders/mod.rs

pub mod store;

pub use store::{LoadPhase, OrderBook, OrderRow, OrderStore, Reload};
