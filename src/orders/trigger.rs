//! Trigger evaluation for limit orders

use rust_decimal::Decimal;
use crate::types::{CostBasisSnapshot, LimitOrder, TokenPrices, TradeSide, TriggerType};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NoNativePrice,
    NoUsdPrice,
    NoMarketCap,
    NoCostBasis,
    /// Multiple on a BUY order.
    UnsupportedSide,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    Fire { observed: Decimal, threshold: Decimal },
    Hold,
    Skip(SkipReason),
}

impl TriggerOutcome {
    pub fn fires(&self) -> bool {
        matches!(self, TriggerOutcome::Fire { .. })
    }
}

/// BUY fires at or below the threshold, SELL at or above.
fn compare(side: TradeSide, observed: Decimal, threshold: Decimal) -> TriggerOutcome {
    let hit = match side {
        TradeSide::Buy => observed <= threshold,
        TradeSide::Sell => observed >= threshold,
    };
    if hit {
        TriggerOutcome::Fire { observed, threshold }
    } else {
        TriggerOutcome::Hold
    }
}

pub fn evaluate(
    order: &LimitOrder,
    prices: &TokenPrices,
    basis: Option<&CostBasisSnapshot>,
) -> TriggerOutcome {
    match order.trigger_type {
        TriggerType::NativePrice => match prices.native_price {
            Some(price) => compare(order.side, price, order.trigger_value),
            None => TriggerOutcome::Skip(SkipReason::NoNativePrice),
        },
        TriggerType::UsdPrice => match prices.usd_price {
            Some(usd) => compare(order.side, usd, order.trigger_value),
            None => TriggerOutcome::Skip(SkipReason::NoUsdPrice),
        },
        TriggerType::MarketCap => match prices.market_cap_usd {
            Some(cap) => compare(order.side, cap, order.trigger_value),
            None => TriggerOutcome::Skip(SkipReason::NoMarketCap),
        },
        TriggerType::Multiple => {
            if order.side != TradeSide::Sell {
                return TriggerOutcome::Skip(SkipReason::UnsupportedSide);
            }
            let Some(price) = prices.native_price else {
                return TriggerOutcome::Skip(SkipReason::NoNativePrice);
            };
            let Some(basis) = basis else {
                return TriggerOutcome::Skip(SkipReason::NoCostBasis);
            };
            match order.trigger_value.checked_mul(basis.avg_native_per_token) {
                Some(threshold) => compare(TradeSide::Sell, price, threshold),
                None => TriggerOutcome::Hold,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{U256, address};
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use crate::types::OrderStatus;

    fn order(side: TradeSide, trigger_type: TriggerType, trigger_value: Decimal) -> LimitOrder {
        LimitOrder {
            id: 1,
            user_id: 9,
            wallet_id: 1,
            token_address: address!("5555555555555555555555555555555555555555"),
            side,
            amount_native_wei: None,
            sell_percent: Some(100),
            trigger_type,
            trigger_value,
            status: OrderStatus::Open,
            last_error: None,
            tx_hash: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn prices(native_price: Decimal) -> TokenPrices {
        TokenPrices {
            decimals: Some(18),
            native_price: Some(native_price),
            usd_price: None,
            market_cap_usd: None,
        }
    }

    fn basis(avg: Decimal) -> CostBasisSnapshot {
        CostBasisSnapshot {
            avg_native_per_token: avg,
            total_native_in: U256::from(1u64),
            net_tokens: U256::from(1u64),
        }
    }

    #[test]
    fn multiple_fires_at_twice_entry_and_not_below() {
        let sell = order(TradeSide::Sell, TriggerType::Multiple, dec!(2));
        let entry = basis(dec!(0.002));

        assert!(evaluate(&sell, &prices(dec!(0.004)), Some(&entry)).fires());
        assert!(evaluate(&sell, &prices(dec!(0.0045)), Some(&entry)).fires());
        assert_eq!(evaluate(&sell, &prices(dec!(0.0039)), Some(&entry)), TriggerOutcome::Hold);
    }

    #[test]
    fn multiple_without_basis_is_skipped() {
        let sell = order(TradeSide::Sell, TriggerType::Multiple, dec!(2));
        assert_eq!(
            evaluate(&sell, &prices(dec!(1)), None),
            TriggerOutcome::Skip(SkipReason::NoCostBasis)
        );
    }

    #[test]
    fn buy_fires_at_or_below_sell_at_or_above() {
        let buy = order(TradeSide::Buy, TriggerType::NativePrice, dec!(0.001));
        assert!(evaluate(&buy, &prices(dec!(0.001)), None).fires());
        assert!(evaluate(&buy, &prices(dec!(0.0009)), None).fires());
        assert!(!evaluate(&buy, &prices(dec!(0.0011)), None).fires());

        let sell = order(TradeSide::Sell, TriggerType::NativePrice, dec!(0.001));
        assert!(evaluate(&sell, &prices(dec!(0.001)), None).fires());
        assert!(!evaluate(&sell, &prices(dec!(0.0009)), None).fires());
    }

    #[test]
    fn usd_and_market_cap_skip_when_unresolved() {
        let usd = order(TradeSide::Buy, TriggerType::UsdPrice, dec!(1.5));
        assert_eq!(evaluate(&usd, &prices(dec!(1)), None), TriggerOutcome::Skip(SkipReason::NoUsdPrice));

        let cap = order(TradeSide::Sell, TriggerType::MarketCap, dec!(1000000));
        assert_eq!(evaluate(&cap, &prices(dec!(1)), None), TriggerOutcome::Skip(SkipReason::NoMarketCap));

        let mut known = prices(dec!(1));
        known.market_cap_usd = Some(dec!(2500000));
        assert!(evaluate(&cap, &known, None).fires());
    }

    #[test]
    fn unpriced_tokens_skip_native_triggers() {
        let unpriced = TokenPrices {
            decimals: None,
            native_price: None,
            usd_price: None,
            market_cap_usd: None,
        };
        let buy = order(TradeSide::Buy, TriggerType::NativePrice, dec!(0.001));
        assert_eq!(evaluate(&buy, &unpriced, None), TriggerOutcome::Skip(SkipReason::NoNativePrice));

        let sell = order(TradeSide::Sell, TriggerType::Multiple, dec!(2));
        assert_eq!(
            evaluate(&sell, &unpriced, Some(&basis(dec!(0.002)))),
            TriggerOutcome::Skip(SkipReason::NoNativePrice)
        );

        let cap = order(TradeSide::Sell, TriggerType::MarketCap, dec!(1000000));
        assert_eq!(evaluate(&cap, &unpriced, None), TriggerOutcome::Skip(SkipReason::NoMarketCap));
    }
}
