//! Mathematical utility functions

use alloy::primitives::U256;
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use std::str::FromStr;

pub const NATIVE_DECIMALS: u8 = 18;
pub const GWEI_DECIMALS: u32 = 9;

pub fn pow10(n: i32) -> Decimal {
    match n {
        0 => dec!(1),
        6 => dec!(1_000_000),
        9 => dec!(1_000_000_000),
        18 => dec!(1_000_000_000_000_000_000),
        _ => {
            let mut result = dec!(1);
            if n > 0 {
                for _ in 0..n {
                    result *= dec!(10);
                }
            } else {
                for _ in 0..(-n) {
                    result /= dec!(10);
                }
            }
            result
        }
    }
}

pub fn u256_to_f64(value: U256) -> f64 {
    value.to_string().parse().unwrap_or(f64::MAX)
}

/// Human-scaled amount for `value` base units of a token with `decimals`.
///
/// Exact while the amount fits a `Decimal`, otherwise through `f64` with
/// the precision loss that implies.
pub fn units_to_decimal(value: U256, decimals: u8) -> Decimal {
    let scale = u32::from(decimals);
    if let Some(raw) = u128::try_from(value).ok().and_then(|v| i128::try_from(v).ok()) {
        if scale <= 28 {
            if let Ok(exact) = Decimal::try_from_i128_with_scale(raw, scale) {
                return exact.normalize();
            }
        }
    }
    let approx = u256_to_f64(value) / 10f64.powi(i32::from(decimals));
    Decimal::from_f64(approx).unwrap_or(Decimal::MAX)
}

/// Base units for a human-scaled amount, truncating extra precision.
pub fn decimal_to_units(amount: Decimal, decimals: u8) -> Option<U256> {
    if amount.is_sign_negative() {
        return None;
    }
    let shifted = amount.checked_mul(pow10(i32::from(decimals)))?.trunc();
    U256::from_str(&shifted.to_string()).ok()
}

/// Ratio of two decimals, falling back to `f64` when the quotient overflows.
pub fn ratio(numerator: Decimal, denominator: Decimal) -> Option<Decimal> {
    if denominator.is_zero() {
        return None;
    }
    numerator.checked_div(denominator).or_else(|| {
        let approx = numerator.to_f64()? / denominator.to_f64()?;
        Decimal::from_f64(approx)
    })
}

/// Converts gwei to wei at 9 fractional digits. Positive inputs never yield zero.
pub fn gwei_to_wei(gwei: Decimal) -> Option<u128> {
    if gwei.is_sign_negative() {
        return None;
    }
    let rounded = gwei.round_dp_with_strategy(GWEI_DECIMALS, RoundingStrategy::MidpointAwayFromZero);
    let wei = rounded.checked_mul(pow10(GWEI_DECIMALS as i32))?.to_u128()?;
    if wei == 0 && gwei > Decimal::ZERO {
        Some(1)
    } else {
        Some(wei)
    }
}

pub fn wei_to_gwei(wei: u128) -> Decimal {
    Decimal::from_u128(wei).unwrap_or(Decimal::MAX) / pow10(GWEI_DECIMALS as i32)
}

/// Truncates a message to at most `max` characters on a char boundary.
pub fn truncate_message(message: &str, max: usize) -> String {
    match message.char_indices().nth(max) {
        Some((idx, _)) => message[..idx].to_string(),
        None => message.to_string(),
    }
}
