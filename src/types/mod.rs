//! Core data types and structures

pub mod addresses;
pub mod route;
pub mod gas;
pub mod trade;
pub mod order;
pub mod wallet;
pub mod market;

pub use addresses::*;
pub use route::*;
pub use gas::*;
pub use trade::*;
pub use order::*;
pub use wallet::*;
pub use market::*;

/// Chat-side user identifier.
pub type UserId = i64;
