//! Per-user gas preferences

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use crate::{
    errors::EngineResult,
    types::{GasSettings, UserId},
};

#[async_trait]
pub trait GasSettingsSource: Send + Sync {
    async fn gas_settings(&self, user_id: UserId) -> EngineResult<GasSettings>;
}

/// In-memory settings with a shared default for unknown users.
pub struct StaticGasSettings {
    default: GasSettings,
    overrides: RwLock<HashMap<UserId, GasSettings>>,
}

impl StaticGasSettings {
    pub fn new(default: GasSettings) -> Self {
        Self {
            default,
            overrides: RwLock::new(HashMap::new()),
        }
    }

    pub async fn set(&self, user_id: UserId, settings: GasSettings) {
        self.overrides.write().await.insert(user_id, settings);
    }
}

#[async_trait]
impl GasSettingsSource for StaticGasSettings {
    async fn gas_settings(&self, user_id: UserId) -> EngineResult<GasSettings> {
        Ok(self
            .overrides
            .read()
            .await
            .get(&user_id)
            .copied()
            .unwrap_or(self.default))
    }
}
