//! Weighted-average cost basis from trade history

use alloy::primitives::{Address, U256};
use std::sync::Arc;
use crate::{
    errors::EngineResult,
    storage::TradeLog,
    types::{CostBasisSnapshot, Trade, TradeSide, TradeStatus, UserId},
    utils::{NATIVE_DECIMALS, ratio, units_to_decimal},
};

pub struct CostBasisLedger {
    trades: Arc<dyn TradeLog>,
}

impl CostBasisLedger {
    pub fn new(trades: Arc<dyn TradeLog>) -> Self {
        Self { trades }
    }

    /// Replays the user's history for `token`. `None` means no open position.
    pub async fn average_entry(
        &self,
        user_id: UserId,
        token: Address,
        decimals: u8,
    ) -> EngineResult<Option<CostBasisSnapshot>> {
        let trades = self.trades.trades_for(user_id, token).await?;
        Ok(fold_cost_basis(&trades, decimals))
    }
}

/// Running totals after replaying `trades` in id order. Reverted trades are skipped.
pub fn fold_totals(trades: &[Trade]) -> (U256, U256) {
    let mut ordered: Vec<&Trade> = trades
        .iter()
        .filter(|t| t.status != TradeStatus::Reverted)
        .collect();
    ordered.sort_by_key(|t| t.id);

    let mut native_in = U256::ZERO;
    let mut tokens = U256::ZERO;

    for trade in ordered {
        match trade.side {
            TradeSide::Buy => {
                native_in = native_in.saturating_add(trade.native_amount_wei);
                tokens = tokens.saturating_add(trade.token_amount_wei);
            }
            TradeSide::Sell => {
                if tokens.is_zero() {
                    continue;
                }
                let sold = trade.token_amount_wei.min(tokens);
                let native_removed = match native_in.checked_mul(sold) {
                    Some(product) => product / tokens,
                    None => native_in / tokens * sold,
                };
                native_in = native_in.saturating_sub(native_removed);
                tokens -= sold;
            }
        }
    }

    (native_in, tokens)
}

pub fn fold_cost_basis(trades: &[Trade], decimals: u8) -> Option<CostBasisSnapshot> {
    let (total_native_in, net_tokens) = fold_totals(trades);
    if net_tokens.is_zero() {
        return None;
    }

    let native = units_to_decimal(total_native_in, NATIVE_DECIMALS);
    let held = units_to_decimal(net_tokens, decimals);
    let avg_native_per_token = ratio(native, held)?;

    Some(CostBasisSnapshot {
        avg_native_per_token,
        total_native_in,
        net_tokens,
    })
}
