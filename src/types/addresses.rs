//! Network addresses and default route definitions

use alloy::primitives::{Address, address};

// Base mainnet tokens
pub const WETH_MAINNET: Address = address!("4200000000000000000000000000000000000006");
pub const USDC_MAINNET: Address = address!("833589fCD6eDb6E08f4c7C32D4f71b54bdA02913");
pub const USDC_DECIMALS: u8 = 6;

// UniswapV2-style routers
pub const UNISWAP_V2_ROUTER_MAINNET: Address = address!("4752ba5DBc23f44D87826276BF6Fd6b1C372aD24");
pub const SUSHISWAP_V2_ROUTER_MAINNET: Address = address!("6BDED42c6DA8FBf0d2bA55B2fa120C5e0c8D7891");

// Default routers and base pairs, keyed by label
pub const ROUTERS_MAINNET: &[(&str, Address)] = &[
    ("uniswap-v2", UNISWAP_V2_ROUTER_MAINNET),
    ("sushiswap-v2", SUSHISWAP_V2_ROUTER_MAINNET),
];

pub const BASE_PAIRS_MAINNET: &[(&str, Address)] = &[
    ("WETH", WETH_MAINNET),
    ("USDC", USDC_MAINNET),
];
