//! Limit order evaluation and scheduling

pub mod processing;
pub mod trigger;
pub mod engine;

pub use processing::*;
pub use trigger::*;
pub use engine::*;
