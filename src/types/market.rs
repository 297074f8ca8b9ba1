//! Market data types

use rust_decimal::Decimal;
use serde::Serialize;

/// Best-effort metrics for a token's most liquid pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PairMetrics {
    pub price_usd: Option<Decimal>,
    pub liquidity_usd: Option<Decimal>,
    pub market_cap_usd: Option<Decimal>,
}

/// Prices for one token, resolved once per engine tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenPrices {
    pub decimals: Option<u8>,
    /// Native units paid for one whole token.
    pub native_price: Option<Decimal>,
    pub usd_price: Option<Decimal>,
    pub market_cap_usd: Option<Decimal>,
}
