//! Limit order types and lifecycle

use alloy::primitives::{Address, B256, U256};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use super::{TradeSide, UserId, WalletId};

pub type OrderId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriggerType {
    NativePrice,
    UsdPrice,
    MarketCap,
    /// Multiple of the average entry price, SELL only.
    Multiple,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    Open,
    Filled,
    Cancelled,
    Error,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Open)
    }
}

/// Terminal transitions an OPEN order can take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderTransition {
    Filled { tx_hash: B256 },
    Cancelled,
    Failed { message: String },
}

impl OrderTransition {
    pub fn target(&self) -> OrderStatus {
        match self {
            OrderTransition::Filled { .. } => OrderStatus::Filled,
            OrderTransition::Cancelled => OrderStatus::Cancelled,
            OrderTransition::Failed { .. } => OrderStatus::Error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLimitOrder {
    pub user_id: UserId,
    pub wallet_id: WalletId,
    pub token_address: Address,
    pub side: TradeSide,
    pub amount_native_wei: Option<U256>,
    pub sell_percent: Option<u8>,
    pub trigger_type: TriggerType,
    pub trigger_value: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitOrder {
    pub id: OrderId,
    pub user_id: UserId,
    pub wallet_id: WalletId,
    pub token_address: Address,
    pub side: TradeSide,
    pub amount_native_wei: Option<U256>,
    pub sell_percent: Option<u8>,
    pub trigger_type: TriggerType,
    pub trigger_value: Decimal,
    pub status: OrderStatus,
    pub last_error: Option<String>,
    pub tx_hash: Option<B256>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
