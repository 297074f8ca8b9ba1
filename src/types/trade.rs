//! Trade records and cost basis

use alloy::primitives::{Address, B256, U256};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use super::UserId;

pub type TradeId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeSide {
    Buy,
    Sell,
}

/// Settlement state of a recorded trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeStatus {
    /// Submitted, amounts taken from the pre-trade quote.
    Pending,
    Confirmed,
    Reverted,
}

/// Trade as produced by the executor, before the log assigns an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTrade {
    pub user_id: UserId,
    pub wallet_address: Address,
    pub token_address: Address,
    pub side: TradeSide,
    pub native_amount_wei: U256,
    pub token_amount_wei: U256,
    pub route_key: String,
    pub tx_hash: B256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub id: TradeId,
    pub user_id: UserId,
    pub wallet_address: Address,
    pub token_address: Address,
    pub side: TradeSide,
    pub native_amount_wei: U256,
    pub token_amount_wei: U256,
    pub route_key: String,
    pub tx_hash: B256,
    pub status: TradeStatus,
    pub created_at: DateTime<Utc>,
}

/// Weighted-average entry for a held position, derived from trade history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostBasisSnapshot {
    pub avg_native_per_token: Decimal,
    pub total_native_in: U256,
    pub net_tokens: U256,
}
