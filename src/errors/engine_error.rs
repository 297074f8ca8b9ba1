//! Custom error types for the trading engine

use alloy::primitives::{Address, B256, U256};
use std::time::Duration;
use thiserror::Error;
use crate::types::{OrderId, OrderStatus, WalletId};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("No liquidity: no route quoted {token}")]
    NoLiquidity { token: Address },

    #[error("Insufficient balance: need {required}, have {available}")]
    InsufficientBalance { required: U256, available: U256 },

    #[error("Approval required: {spender} may spend {allowance} of {token}, need {required}")]
    ApprovalRequired {
        token: Address,
        spender: Address,
        allowance: U256,
        required: U256,
    },

    #[error("Transaction submission failed: {message}")]
    SubmissionFailed {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    #[error("Transaction {tx_hash} reverted")]
    Reverted { tx_hash: B256 },

    #[error("Price data unavailable for {token}: {reason}")]
    PriceDataUnavailable { token: Address, reason: String },

    #[error("{operation} timed out after {elapsed:?}")]
    Timeout { operation: String, elapsed: Duration },

    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
        retry_count: u32,
    },

    #[error("Contract interaction failed: {contract} - {message}")]
    Contract {
        contract: Address,
        message: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Invalid configuration: {field} = {value}")]
    InvalidConfig { field: String, value: String },

    #[error("Wallet {wallet_id} not found")]
    WalletNotFound { wallet_id: WalletId },

    #[error("Invalid order: {reason}")]
    InvalidOrder { reason: String },

    #[error("Order {order_id} is {status:?}: {reason}")]
    InvalidTransition {
        order_id: OrderId,
        status: OrderStatus,
        reason: String,
    },

    #[error("Order {order_id} not found")]
    OrderNotFound { order_id: OrderId },

    #[error("Storage error: {context}")]
    Storage {
        context: String,
        #[source]
        source: anyhow::Error,
    },
}

impl EngineError {
    pub fn invalid_config(field: &str, value: impl ToString) -> Self {
        EngineError::InvalidConfig {
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    pub fn storage(context: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        EngineError::Storage {
            context: context.into(),
            source: source.into(),
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
