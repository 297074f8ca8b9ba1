//! Gas estimation, swap submission and confirmation tracking

pub mod engine;
pub mod gas;
pub mod trader;
pub mod confirmations;

pub use engine::*;
pub use gas::*;
pub use trader::*;
pub use confirmations::*;
