//! Token price resolution from routes and market data

use alloy::primitives::{Address, U256};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, warn};
use crate::{
    errors::{EngineError, EngineResult},
    network::{ChainClient, MarketDataFeed, token_decimals, total_supply},
    routing::RouteQuoter,
    types::{PairMetrics, SwapDirection, TokenPrices},
    utils::{NATIVE_DECIMALS, units_to_decimal},
};

pub struct PriceOracle {
    chain: Arc<dyn ChainClient>,
    quoter: Arc<RouteQuoter>,
    market_data: Arc<dyn MarketDataFeed>,
}

impl PriceOracle {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        quoter: Arc<RouteQuoter>,
        market_data: Arc<dyn MarketDataFeed>,
    ) -> Self {
        Self { chain, quoter, market_data }
    }

    pub async fn native_usd_price(&self) -> Option<Decimal> {
        self.quoter.native_usd_price().await
    }

    /// Native units received for selling one whole token.
    pub async fn native_price(&self, token: Address, decimals: u8) -> EngineResult<Decimal> {
        let one_token = U256::from(10u64).pow(U256::from(decimals));
        let quote = self
            .quoter
            .quote(SwapDirection::TokenToNative, one_token, token)
            .await
            .ok_or(EngineError::NoLiquidity { token })?;

        Ok(units_to_decimal(quote.amount_out, NATIVE_DECIMALS))
    }

    /// Resolves every metric a trigger may need. Each one is independent: USD
    /// figures prefer the external feed and fall back to on-chain price × `native_usd`.
    pub async fn token_prices(&self, token: Address, native_usd: Option<Decimal>) -> TokenPrices {
        let decimals = match token_decimals(self.chain.as_ref(), token).await {
            Ok(decimals) => Some(decimals),
            Err(e) => {
                debug!(%token, error = %e, "decimals unavailable");
                None
            }
        };
        let native_price = match decimals {
            Some(decimals) => match self.native_price(token, decimals).await {
                Ok(price) => Some(price),
                Err(e) => {
                    debug!(%token, error = %e, "On-chain price unavailable");
                    None
                }
            },
            None => None,
        };
        let metrics = self.market_data.best_pair_metrics(token).await.unwrap_or_default();

        let usd_price = settle_metric(token, "USD price", usd_price(token, &metrics, native_price, native_usd));
        let market_cap_usd = settle_metric(
            token,
            "market cap",
            self.market_cap(token, &metrics, usd_price, decimals).await,
        );

        TokenPrices {
            decimals,
            native_price,
            usd_price,
            market_cap_usd,
        }
    }

    /// Feed market cap, else total supply × USD price.
    async fn market_cap(
        &self,
        token: Address,
        metrics: &PairMetrics,
        usd_price: Option<Decimal>,
        decimals: Option<u8>,
    ) -> EngineResult<Decimal> {
        if let Some(cap) = metrics.market_cap_usd {
            return Ok(cap);
        }
        let (Some(price), Some(decimals)) = (usd_price, decimals) else {
            return Err(EngineError::PriceDataUnavailable {
                token,
                reason: "no feed market cap and no USD price to derive one".to_string(),
            });
        };
        let supply = total_supply(self.chain.as_ref(), token).await?;
        units_to_decimal(supply, decimals)
            .checked_mul(price)
            .ok_or_else(|| EngineError::PriceDataUnavailable {
                token,
                reason: "market cap overflow".to_string(),
            })
    }
}

fn usd_price(
    token: Address,
    metrics: &PairMetrics,
    native_price: Option<Decimal>,
    native_usd: Option<Decimal>,
) -> EngineResult<Decimal> {
    if let Some(price) = metrics.price_usd {
        return Ok(price);
    }
    native_price
        .zip(native_usd)
        .and_then(|(price, usd)| price.checked_mul(usd))
        .ok_or_else(|| EngineError::PriceDataUnavailable {
            token,
            reason: "no feed price and no on-chain fallback".to_string(),
        })
}

fn settle_metric(token: Address, metric: &str, resolved: EngineResult<Decimal>) -> Option<Decimal> {
    match resolved {
        Ok(value) => Some(value),
        Err(EngineError::PriceDataUnavailable { reason, .. }) => {
            debug!(%token, metric, %reason, "Metric unavailable");
            None
        }
        Err(e) => {
            warn!(%token, metric, error = %e, "⚠️ Metric lookup failed");
            None
        }
    }
}
