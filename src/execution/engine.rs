//! Swap execution against the best available route

use alloy::{
    primitives::{Address, B256, U256},
    rpc::types::eth::TransactionRequest,
    signers::local::PrivateKeySigner,
    sol_types::SolCall,
};
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, warn};
use crate::{
    errors::{EngineError, EngineResult},
    network::{
        ChainClient, IERC20, IUniswapV2Router02, NonceTag, allowance, token_balance,
    },
    routing::RouteQuoter,
    types::{GasEnvelope, RoutedQuote, SwapDirection, TradeSide},
};

/// Result of a swap accepted by the node. Confirmation is tracked separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapSubmission {
    pub tx_hash: B256,
    pub route_key: String,
    pub router: Address,
    /// Execution-time quote the trade was priced with.
    pub quoted_out: U256,
    pub approval_tx: Option<B256>,
}

/// (owner, token, spender)
type AllowanceKey = (Address, Address, Address);

pub struct TradeExecutor {
    chain: Arc<dyn ChainClient>,
    quoter: Arc<RouteQuoter>,
    deadline: Duration,
    approved: Mutex<HashSet<AllowanceKey>>,
}

impl TradeExecutor {
    pub fn new(chain: Arc<dyn ChainClient>, quoter: Arc<RouteQuoter>, deadline: Duration) -> Self {
        Self {
            chain,
            quoter,
            deadline,
            approved: Mutex::new(HashSet::new()),
        }
    }

    pub async fn swap(
        &self,
        side: TradeSide,
        signer: &PrivateKeySigner,
        token: Address,
        amount_in: U256,
        min_amount_out: U256,
        gas: &GasEnvelope,
    ) -> EngineResult<SwapSubmission> {
        let owner = signer.address();
        let direction = match side {
            TradeSide::Buy => SwapDirection::NativeToToken,
            TradeSide::Sell => SwapDirection::TokenToNative,
        };

        let routed = self
            .quoter
            .best_route(direction, amount_in, token)
            .await
            .ok_or(EngineError::NoLiquidity { token })?;

        let available = match side {
            TradeSide::Buy => self.chain.get_balance(owner).await?,
            TradeSide::Sell => token_balance(self.chain.as_ref(), token, owner).await?,
        };
        if available < amount_in {
            return Err(EngineError::InsufficientBalance {
                required: amount_in,
                available,
            });
        }

        let router = routed.route.router;
        let mut nonce = self.chain.get_transaction_count(owner, NonceTag::Pending).await?;
        let first_use = self.approved.lock().await.insert((owner, token, router));
        let mut approval_tx = None;

        // A sell of a new token needs its allowance in the mempool ahead of the swap.
        if first_use && side == TradeSide::Sell {
            approval_tx = self.dispatch_approval(signer, token, router, nonce, gas).await;
            if approval_tx.is_some() {
                nonce += 1;
            }
        }

        let tx = self.build_swap(side, &routed, owner, amount_in, min_amount_out, gas).nonce(nonce);
        let tx_hash = match self.chain.send_transaction(signer, tx).await {
            Ok(tx_hash) => tx_hash,
            Err(e) => {
                if first_use && approval_tx.is_none() {
                    self.approved.lock().await.remove(&(owner, token, router));
                }
                return Err(e);
            }
        };

        info!(
            %tx_hash,
            side = ?side,
            %token,
            route = %routed.quote.route_key,
            amount_in = %amount_in,
            quoted_out = %routed.quote.amount_out,
            "🚀 Swap submitted"
        );

        // Buying a new token pre-approves it so a later sell does not wait.
        if first_use && side == TradeSide::Buy {
            approval_tx = self.dispatch_approval(signer, token, router, nonce + 1, gas).await;
        }

        Ok(SwapSubmission {
            tx_hash,
            route_key: routed.quote.route_key,
            router,
            quoted_out: routed.quote.amount_out,
            approval_tx,
        })
    }

    fn build_swap(
        &self,
        side: TradeSide,
        routed: &RoutedQuote,
        recipient: Address,
        amount_in: U256,
        min_amount_out: U256,
        gas: &GasEnvelope,
    ) -> TransactionRequest {
        let deadline = U256::from(Utc::now().timestamp().max(0) as u64 + self.deadline.as_secs());
        let path = routed.path.clone();

        let (calldata, value) = match side {
            TradeSide::Buy => (
                IUniswapV2Router02::swapExactETHForTokensSupportingFeeOnTransferTokensCall {
                    amountOutMin: min_amount_out,
                    path,
                    to: recipient,
                    deadline,
                }
                .abi_encode(),
                amount_in,
            ),
            TradeSide::Sell => (
                IUniswapV2Router02::swapExactTokensForETHSupportingFeeOnTransferTokensCall {
                    amountIn: amount_in,
                    amountOutMin: min_amount_out,
                    path,
                    to: recipient,
                    deadline,
                }
                .abi_encode(),
                U256::ZERO,
            ),
        };

        with_gas(
            TransactionRequest::default()
                .to(routed.route.router)
                .value(value)
                .input(calldata.into()),
            gas,
        )
    }

    /// Sends an unlimited approval without waiting for it to be mined.
    /// Send failures are logged and the key is forgotten so a later trade retries.
    async fn dispatch_approval(
        &self,
        signer: &PrivateKeySigner,
        token: Address,
        spender: Address,
        nonce: u64,
        gas: &GasEnvelope,
    ) -> Option<B256> {
        match self.send_approval(signer, token, spender, Some(nonce), gas).await {
            Ok(tx_hash) => {
                info!(%tx_hash, %token, %spender, "📝 Approval dispatched");
                Some(tx_hash)
            }
            Err(e) => {
                warn!(%token, %spender, error = %e, "⚠️ Approval dispatch failed");
                self.approved.lock().await.remove(&(signer.address(), token, spender));
                None
            }
        }
    }

    async fn send_approval(
        &self,
        signer: &PrivateKeySigner,
        token: Address,
        spender: Address,
        nonce: Option<u64>,
        gas: &GasEnvelope,
    ) -> EngineResult<B256> {
        let calldata = IERC20::approveCall { spender, value: U256::MAX }.abi_encode();
        let mut tx = with_gas(TransactionRequest::default().to(token).input(calldata.into()), gas);
        if let Some(nonce) = nonce {
            tx = tx.nonce(nonce);
        }
        self.chain.send_transaction(signer, tx).await
    }

    /// Approves `spender` only when the current allowance is short of `amount`.
    pub async fn ensure_approval(
        &self,
        signer: &PrivateKeySigner,
        token: Address,
        spender: Address,
        amount: U256,
        gas: &GasEnvelope,
    ) -> EngineResult<Option<B256>> {
        let owner = signer.address();
        let current = allowance(self.chain.as_ref(), token, owner, spender).await?;
        if current >= amount {
            self.approved.lock().await.insert((owner, token, spender));
            return Ok(None);
        }

        let tx_hash = self.send_approval(signer, token, spender, None, gas).await?;
        self.approved.lock().await.insert((owner, token, spender));
        info!(%tx_hash, %token, %spender, "📝 Approval sent");
        Ok(Some(tx_hash))
    }

    /// Synchronous allowance check for callers that want to fail early.
    pub async fn require_allowance(
        &self,
        owner: Address,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> EngineResult<()> {
        let current = allowance(self.chain.as_ref(), token, owner, spender).await?;
        if current < amount {
            return Err(EngineError::ApprovalRequired {
                token,
                spender,
                allowance: current,
                required: amount,
            });
        }
        Ok(())
    }
}

fn with_gas(tx: TransactionRequest, gas: &GasEnvelope) -> TransactionRequest {
    tx.gas_limit(gas.gas_limit)
        .max_fee_per_gas(gas.max_fee_per_gas)
        .max_priority_fee_per_gas(gas.max_priority_fee_per_gas)
}
