//! Position accounting

pub mod cost_basis;

pub use cost_basis::*;
