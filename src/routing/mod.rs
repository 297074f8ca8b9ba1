//! Route quoting and price discovery

pub mod quoter;
pub mod pricing;

pub use quoter::*;
pub use pricing::*;
