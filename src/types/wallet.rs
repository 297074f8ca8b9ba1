//! Wallet records handed out by the key store

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use super::UserId;

pub type WalletId = u64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletRecord {
    pub id: WalletId,
    pub user_id: UserId,
    pub address: Address,
}
