//! Engine configuration settings and environment variable handling

use alloy::primitives::Address;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;
use crate::{
    errors::{EngineError, EngineResult},
    types::{
        BASE_PAIRS_MAINNET, ROUTERS_MAINNET, RouteConfig, USDC_DECIMALS, USDC_MAINNET, UserId,
        WETH_MAINNET,
    },
};

// Configuration constants
pub const DEFAULT_LIMIT_ORDER_INTERVAL_MS: u64 = 15_000;
pub const MIN_LIMIT_ORDER_INTERVAL_MS: u64 = 1_000;
pub const DEFAULT_PROCESSING_TTL_SECS: u64 = 300;
pub const DEFAULT_SWAP_DEADLINE_SECS: u64 = 300;
pub const MAX_SWAP_DEADLINE_SECS: u64 = 1_200;
pub const DEFAULT_GAS_LIMIT: u64 = 300_000;
pub const DEFAULT_QUOTE_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_BALANCE_TIMEOUT_MS: u64 = 3_000;
pub const DEFAULT_CONFIRMATION_TIMEOUT_SECS: u64 = 180;
pub const MAX_ERROR_MESSAGE_LEN: usize = 200;
pub const DEFAULT_MARKET_DATA_URL: &str = "https://api.dexscreener.com";

#[derive(Debug, Clone)]
pub struct Config {
    pub rpc_url: String,
    pub chain_id: u64,
    pub wrapped_native: Address,
    pub stable_token: Address,
    pub stable_decimals: u8,
    /// Candidate routes, routers × base pairs, in configured order.
    pub routes: Vec<RouteConfig>,
    // Limit order engine
    pub limit_order_interval_ms: u64,
    pub processing_ttl_secs: u64,
    // Trade execution
    pub swap_deadline_secs: u64,
    pub default_gas_limit: u64,
    pub quote_timeout_ms: u64,
    pub balance_timeout_ms: u64,
    pub confirmation_timeout_secs: u64,
    // Default gas boosts for users without stored settings
    pub default_gas_flat_gwei: f64,
    pub default_gas_percent: f64,
    // Collaborators
    pub market_data_url: String,
    pub data_dir: PathBuf,
    pub private_key: Option<String>,
    pub owner_user_id: UserId,
}

impl Config {
    pub fn load() -> Self {
        let wrapped_native = env_address("WRAPPED_NATIVE").unwrap_or(WETH_MAINNET);
        let routers = env_labelled_addresses("ROUTERS").unwrap_or_else(|| to_owned(ROUTERS_MAINNET));
        let base_pairs = env_labelled_addresses("BASE_PAIRS").unwrap_or_else(|| to_owned(BASE_PAIRS_MAINNET));

        Self {
            rpc_url: env::var("RPC_URL")
                .unwrap_or_else(|_| "https://mainnet.base.org".to_string()),
            chain_id: env_parse("CHAIN_ID").unwrap_or(8453),
            wrapped_native,
            stable_token: env_address("STABLE_TOKEN").unwrap_or(USDC_MAINNET),
            stable_decimals: env_parse("STABLE_DECIMALS").unwrap_or(USDC_DECIMALS),
            routes: build_routes(&routers, &base_pairs),
            limit_order_interval_ms: env_parse("LIMIT_ORDER_INTERVAL_MS")
                .unwrap_or(DEFAULT_LIMIT_ORDER_INTERVAL_MS)
                .max(MIN_LIMIT_ORDER_INTERVAL_MS),
            processing_ttl_secs: env_parse("PROCESSING_TTL_SECS")
                .unwrap_or(DEFAULT_PROCESSING_TTL_SECS),
            swap_deadline_secs: env_parse("SWAP_DEADLINE_SECS")
                .unwrap_or(DEFAULT_SWAP_DEADLINE_SECS)
                .min(MAX_SWAP_DEADLINE_SECS),
            default_gas_limit: env_parse("DEFAULT_GAS_LIMIT").unwrap_or(DEFAULT_GAS_LIMIT),
            quote_timeout_ms: env_parse("QUOTE_TIMEOUT_MS").unwrap_or(DEFAULT_QUOTE_TIMEOUT_MS),
            balance_timeout_ms: env_parse("BALANCE_TIMEOUT_MS").unwrap_or(DEFAULT_BALANCE_TIMEOUT_MS),
            confirmation_timeout_secs: env_parse("CONFIRMATION_TIMEOUT_SECS")
                .unwrap_or(DEFAULT_CONFIRMATION_TIMEOUT_SECS),
            default_gas_flat_gwei: env_parse("GAS_FLAT_GWEI").unwrap_or(0.0),
            default_gas_percent: env_parse("GAS_PERCENT").unwrap_or(0.0),
            market_data_url: env::var("MARKET_DATA_URL")
                .unwrap_or_else(|_| DEFAULT_MARKET_DATA_URL.to_string()),
            data_dir: env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("output")),
            private_key: env::var("PRIVATE_KEY").ok(),
            owner_user_id: env_parse("OWNER_USER_ID").unwrap_or(0),
        }
    }

    /// Configuration for tests and embedders that wire routes by hand.
    pub fn with_routes(routes: Vec<RouteConfig>, wrapped_native: Address) -> Self {
        Self {
            rpc_url: "http://127.0.0.1:8545".to_string(),
            chain_id: 31337,
            wrapped_native,
            stable_token: USDC_MAINNET,
            stable_decimals: USDC_DECIMALS,
            routes,
            limit_order_interval_ms: DEFAULT_LIMIT_ORDER_INTERVAL_MS,
            processing_ttl_secs: DEFAULT_PROCESSING_TTL_SECS,
            swap_deadline_secs: DEFAULT_SWAP_DEADLINE_SECS,
            default_gas_limit: DEFAULT_GAS_LIMIT,
            quote_timeout_ms: DEFAULT_QUOTE_TIMEOUT_MS,
            balance_timeout_ms: DEFAULT_BALANCE_TIMEOUT_MS,
            confirmation_timeout_secs: DEFAULT_CONFIRMATION_TIMEOUT_SECS,
            default_gas_flat_gwei: 0.0,
            default_gas_percent: 0.0,
            market_data_url: DEFAULT_MARKET_DATA_URL.to_string(),
            data_dir: PathBuf::from("output"),
            private_key: None,
            owner_user_id: 0,
        }
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.routes.is_empty() {
            return Err(EngineError::invalid_config("routes", "none configured"));
        }
        for (field, value) in [
            ("GAS_FLAT_GWEI", self.default_gas_flat_gwei),
            ("GAS_PERCENT", self.default_gas_percent),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(EngineError::invalid_config(field, value));
            }
        }
        if self.swap_deadline_secs == 0 {
            return Err(EngineError::invalid_config("SWAP_DEADLINE_SECS", 0));
        }
        Ok(())
    }

    pub fn limit_order_interval(&self) -> Duration {
        Duration::from_millis(self.limit_order_interval_ms)
    }

    pub fn processing_ttl(&self) -> Duration {
        Duration::from_secs(self.processing_ttl_secs)
    }

    pub fn quote_timeout(&self) -> Duration {
        Duration::from_millis(self.quote_timeout_ms)
    }

    pub fn balance_timeout(&self) -> Duration {
        Duration::from_millis(self.balance_timeout_ms)
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }
}

/// Every router paired with every base token, routers outermost.
pub fn build_routes(routers: &[(String, Address)], base_pairs: &[(String, Address)]) -> Vec<RouteConfig> {
    routers
        .iter()
        .flat_map(|(router_label, router)| {
            base_pairs.iter().map(move |(base_label, base_pair)| RouteConfig {
                router_label: router_label.clone(),
                router: *router,
                base_label: base_label.clone(),
                base_pair: *base_pair,
            })
        })
        .collect()
}

/// Parses `label=0xaddr,label=0xaddr`. Malformed entries are skipped.
pub fn parse_labelled_addresses(raw: &str) -> Vec<(String, Address)> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| {
            let (label, addr) = entry.split_once('=')?;
            match Address::from_str(addr.trim()) {
                Ok(address) => Some((label.trim().to_string(), address)),
                Err(e) => {
                    warn!("⚠️ Skipping malformed route entry {}: {}", entry, e);
                    None
                }
            }
        })
        .collect()
}

fn env_labelled_addresses(key: &str) -> Option<Vec<(String, Address)>> {
    let parsed = parse_labelled_addresses(&env::var(key).ok()?);
    if parsed.is_empty() { None } else { Some(parsed) }
}

fn env_address(key: &str) -> Option<Address> {
    env::var(key).ok().and_then(|s| Address::from_str(s.trim()).ok())
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

fn to_owned(entries: &[(&str, Address)]) -> Vec<(String, Address)> {
    entries.iter().map(|(label, addr)| (label.to_string(), *addr)).collect()
}
