//! Persistence for trades and limit orders

pub mod trades;
pub mod orders;

pub use trades::*;
pub use orders::*;
