//! External market data feed

use alloy::primitives::Address;
use anyhow::Context;
use async_trait::async_trait;
use rust_decimal::prelude::*;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};
use crate::{
    errors::{EngineError, EngineResult},
    network::retry::{RetryConfig, retry_with_backoff},
    types::PairMetrics,
};

/// Best-effort pair metrics. `None` means the feed knows nothing useful.
#[async_trait]
pub trait MarketDataFeed: Send + Sync {
    async fn best_pair_metrics(&self, token: Address) -> Option<PairMetrics>;
}

/// Feed that never has data, for deployments without an external source.
pub struct NoMarketData;

#[async_trait]
impl MarketDataFeed for NoMarketData {
    async fn best_pair_metrics(&self, _token: Address) -> Option<PairMetrics> {
        None
    }
}

#[derive(Debug, Deserialize)]
struct TokenPairsResponse {
    pairs: Option<Vec<PairEntry>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PairEntry {
    chain_id: Option<String>,
    price_usd: Option<String>,
    liquidity: Option<LiquidityEntry>,
    market_cap: Option<f64>,
    fdv: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct LiquidityEntry {
    usd: Option<f64>,
}

pub struct DexScreenerFeed {
    client: reqwest::Client,
    base_url: String,
    chain_slug: Option<String>,
}

impl DexScreenerFeed {
    pub fn new(base_url: &str, chain_slug: Option<String>) -> EngineResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(3))
            .build()
            .map_err(|e| {
                warn!("⚠️ Failed to initialize HTTP client: {}", e);
                EngineError::Network {
                    message: "Failed to build HTTP client".to_string(),
                    source: Some(e.into()),
                    retry_count: 0,
                }
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            chain_slug,
        })
    }

    async fn fetch_pairs(&self, token: Address) -> EngineResult<Vec<PairEntry>> {
        let url = format!("{}/latest/dex/tokens/{:#x}", self.base_url, token);

        let operation = || async {
            let response = self.client
                .get(&url)
                .send()
                .await
                .context("HTTP request failed")
                .map_err(transport)?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                warn!("⚠️ Market data API returned error status {}: {}", status, body);
                return Err(transport(anyhow::anyhow!("Market data API error: {} - {}", status, body)));
            }

            let parsed: TokenPairsResponse = response.json().await
                .context("Failed to parse JSON response")
                .map_err(transport)?;
            Ok(parsed.pairs.unwrap_or_default())
        };

        retry_with_backoff(
            operation,
            &RetryConfig {
                max_attempts: 2,
                initial_delay_ms: 200,
                ..Default::default()
            },
            "market data fetch",
        ).await
    }
}

/// DexScreener chain id for the chains it indexes under a known slug.
pub fn chain_slug(chain_id: u64) -> Option<String> {
    let slug = match chain_id {
        1 => "ethereum",
        10 => "optimism",
        56 => "bsc",
        137 => "polygon",
        8453 => "base",
        42161 => "arbitrum",
        _ => return None,
    };
    Some(slug.to_string())
}

fn transport(e: anyhow::Error) -> EngineError {
    EngineError::Network {
        message: e.to_string(),
        source: Some(e),
        retry_count: 0,
    }
}

fn positive(value: Option<f64>) -> Option<Decimal> {
    value
        .filter(|v| v.is_finite() && *v > 0.0)
        .and_then(Decimal::from_f64)
}

/// Picks the pair with the deepest USD liquidity.
fn select_best_pair(pairs: Vec<PairEntry>, chain_slug: Option<&str>) -> Option<PairMetrics> {
    let best = pairs
        .into_iter()
        .filter(|pair| match (chain_slug, pair.chain_id.as_deref()) {
            (Some(wanted), Some(actual)) => wanted.eq_ignore_ascii_case(actual),
            _ => true,
        })
        .max_by(|a, b| {
            let la = a.liquidity.as_ref().and_then(|l| l.usd).unwrap_or(0.0);
            let lb = b.liquidity.as_ref().and_then(|l| l.usd).unwrap_or(0.0);
            la.total_cmp(&lb)
        })?;

    Some(PairMetrics {
        price_usd: best
            .price_usd
            .as_deref()
            .and_then(|p| Decimal::from_str(p).ok())
            .filter(|p| *p > Decimal::ZERO),
        liquidity_usd: positive(best.liquidity.and_then(|l| l.usd)),
        market_cap_usd: positive(best.market_cap).or_else(|| positive(best.fdv)),
    })
}

#[async_trait]
impl MarketDataFeed for DexScreenerFeed {
    async fn best_pair_metrics(&self, token: Address) -> Option<PairMetrics> {
        match self.fetch_pairs(token).await {
            Ok(pairs) => select_best_pair(pairs, self.chain_slug.as_deref()),
            Err(e) => {
                debug!(%token, error = %e, "Market data unavailable");
                None
            }
        }
    }
}
