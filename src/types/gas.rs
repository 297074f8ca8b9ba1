//! Gas and fee types

use serde::{Deserialize, Serialize};

/// Network fee data in wei as reported by the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeData {
    pub max_fee_per_gas: u128,
    pub max_priority_fee_per_gas: u128,
}

/// Submission-ready EIP-1559 fee parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasEnvelope {
    pub max_priority_fee_per_gas: u128,
    pub max_fee_per_gas: u128,
    pub gas_limit: u64,
}

/// Per-user gas preferences.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GasSettings {
    /// Flat surcharge added to both fee components, in gwei.
    pub flat_gwei: f64,
    /// Stored percentage boost applied on top of the surcharge.
    pub percent: f64,
    pub gas_limit: Option<u64>,
}

impl Default for GasSettings {
    fn default() -> Self {
        Self {
            flat_gwei: 0.0,
            percent: 0.0,
            gas_limit: None,
        }
    }
}
