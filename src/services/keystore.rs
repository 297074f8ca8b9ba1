//! Wallet lookup and signing capability

use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use std::collections::HashMap;
use std::str::FromStr;
use crate::{
    errors::{EngineError, EngineResult},
    types::{UserId, WalletId, WalletRecord},
};

/// Hands out wallets and their signers. Decrypted material is never stored by callers.
#[async_trait]
pub trait KeyStore: Send + Sync {
    async fn wallet(&self, wallet_id: WalletId) -> EngineResult<Option<WalletRecord>>;

    async fn signer(&self, wallet: &WalletRecord) -> EngineResult<PrivateKeySigner>;
}

/// Key store over keys supplied at startup, e.g. from `PRIVATE_KEY`.
#[derive(Default)]
pub struct EnvKeyStore {
    wallets: HashMap<WalletId, (WalletRecord, PrivateKeySigner)>,
}

impl EnvKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(mut self, wallet_id: WalletId, user_id: UserId, private_key: &str) -> EngineResult<Self> {
        let signer = PrivateKeySigner::from_str(private_key.trim())
            .map_err(|_| EngineError::invalid_config("PRIVATE_KEY", "<unparseable>"))?;
        let record = WalletRecord {
            id: wallet_id,
            user_id,
            address: signer.address(),
        };
        self.wallets.insert(wallet_id, (record, signer));
        Ok(self)
    }
}

#[async_trait]
impl KeyStore for EnvKeyStore {
    async fn wallet(&self, wallet_id: WalletId) -> EngineResult<Option<WalletRecord>> {
        Ok(self.wallets.get(&wallet_id).map(|(record, _)| record.clone()))
    }

    async fn signer(&self, wallet: &WalletRecord) -> EngineResult<PrivateKeySigner> {
        self.wallets
            .get(&wallet.id)
            .map(|(_, signer)| signer.clone())
            .ok_or(EngineError::WalletNotFound { wallet_id: wallet.id })
    }
}
