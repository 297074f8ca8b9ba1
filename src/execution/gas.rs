//! Fee envelope computation with user-configured boosts

use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tracing::debug;
use crate::{
    errors::{EngineError, EngineResult},
    network::ChainClient,
    services::GasSettingsSource,
    types::{FeeData, GasEnvelope, GasSettings, UserId},
    utils::{gwei_to_wei, wei_to_gwei},
};

pub struct GasEstimator {
    chain: Arc<dyn ChainClient>,
    settings: Arc<dyn GasSettingsSource>,
    default_gas_limit: u64,
}

impl GasEstimator {
    pub fn new(chain: Arc<dyn ChainClient>, settings: Arc<dyn GasSettingsSource>, default_gas_limit: u64) -> Self {
        Self { chain, settings, default_gas_limit }
    }

    /// Live fee data boosted by the user's settings plus a one-shot `extra_percent`.
    pub async fn compute_gas(&self, user_id: UserId, extra_percent: f64) -> EngineResult<GasEnvelope> {
        let settings = self.settings.gas_settings(user_id).await?;
        let fees = self.chain.get_fee_data().await?;
        let envelope = build_envelope(fees, &settings, extra_percent, self.default_gas_limit)?;

        debug!(
            user_id,
            max_fee_gwei = %wei_to_gwei(envelope.max_fee_per_gas),
            priority_gwei = %wei_to_gwei(envelope.max_priority_fee_per_gas),
            gas_limit = envelope.gas_limit,
            "Computed gas envelope"
        );
        Ok(envelope)
    }
}

fn non_negative(field: &str, value: f64) -> EngineResult<Decimal> {
    if !value.is_finite() || value < 0.0 {
        return Err(EngineError::invalid_config(field, value));
    }
    Decimal::from_f64(value).ok_or_else(|| EngineError::invalid_config(field, value))
}

/// `(base + flat) * (1 + (percent + extra) / 100)` per fee component.
pub fn build_envelope(
    fees: FeeData,
    settings: &GasSettings,
    extra_percent: f64,
    default_gas_limit: u64,
) -> EngineResult<GasEnvelope> {
    let flat = non_negative("gas.flat_gwei", settings.flat_gwei)?;
    let percent = non_negative("gas.percent", settings.percent)?;
    let extra = non_negative("gas.extra_percent", extra_percent)?;
    let multiplier = dec!(1) + (percent + extra) / dec!(100);

    let boost = |wei: u128, field: &str| -> EngineResult<u128> {
        let boosted = (wei_to_gwei(wei) + flat)
            .checked_mul(multiplier)
            .ok_or_else(|| EngineError::invalid_config(field, "fee overflow"))?;
        gwei_to_wei(boosted).ok_or_else(|| EngineError::invalid_config(field, boosted))
    };

    let max_priority_fee_per_gas = boost(fees.max_priority_fee_per_gas, "gas.priority_fee")?;
    let max_fee_per_gas = boost(fees.max_fee_per_gas, "gas.max_fee")?.max(max_priority_fee_per_gas);

    Ok(GasEnvelope {
        max_priority_fee_per_gas,
        max_fee_per_gas,
        gas_limit: settings.gas_limit.unwrap_or(default_gas_limit),
    })
}
