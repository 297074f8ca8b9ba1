//! Collaborators the engine consumes through narrow interfaces

pub mod keystore;
pub mod notify;
pub mod gas_settings;

pub use keystore::*;
pub use notify::*;
pub use gas_settings::*;
