//! Swap Engine - token swaps, cost basis and limit orders for EVM chains
//!
//! Quotes every configured router and base pair, executes buys and sells with
//! boosted EIP-1559 fees, keeps a weighted-average cost basis per position and
//! runs a background engine that fires limit orders when their trigger is met.

pub mod config;
pub mod types;
pub mod errors;
pub mod network;
pub mod routing;
pub mod execution;
pub mod ledger;
pub mod storage;
pub mod orders;
pub mod services;
pub mod utils;

// Re-export commonly used items
pub use config::{Config, CONFIG};
pub use errors::{EngineError, EngineResult};
pub use types::*;

// Type alias for our concrete provider
pub type ConcreteProvider = alloy::providers::RootProvider<alloy::transports::BoxTransport>;
