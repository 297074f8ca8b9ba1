//! Chain access, contract bindings, and external data sources

pub mod chain;
pub mod contracts;
pub mod market_data;
pub mod retry;

pub use chain::*;
pub use contracts::*;
pub use market_data::*;
pub use retry::*;
