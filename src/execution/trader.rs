//! Gas, submission, journaling and confirmation hand-off for one trade

use alloy::primitives::{Address, U256};
use std::sync::Arc;
use tracing::error;
use crate::{
    errors::EngineResult,
    execution::{ConfirmationJob, ConfirmationQueue, GasEstimator, SwapSubmission, TradeExecutor},
    services::KeyStore,
    storage::TradeLog,
    types::{NewTrade, Trade, TradeSide, UserId, WalletRecord},
};

#[derive(Debug, Clone)]
pub struct TradeRequest {
    pub user_id: UserId,
    pub wallet: WalletRecord,
    pub side: TradeSide,
    pub token: Address,
    /// Wei for a buy, token units for a sell.
    pub amount_in: U256,
    pub min_amount_out: U256,
    /// One-shot gas boost on top of the user's settings.
    pub extra_gas_percent: f64,
}

#[derive(Debug, Clone)]
pub struct TradeTicket {
    pub submission: SwapSubmission,
    /// `None` when the journal write failed after the swap went out.
    pub trade: Option<Trade>,
}

pub struct Trader {
    keystore: Arc<dyn KeyStore>,
    gas: Arc<GasEstimator>,
    executor: Arc<TradeExecutor>,
    trades: Arc<dyn TradeLog>,
    confirmations: ConfirmationQueue,
}

impl Trader {
    pub fn new(
        keystore: Arc<dyn KeyStore>,
        gas: Arc<GasEstimator>,
        executor: Arc<TradeExecutor>,
        trades: Arc<dyn TradeLog>,
        confirmations: ConfirmationQueue,
    ) -> Self {
        Self { keystore, gas, executor, trades, confirmations }
    }

    pub fn executor(&self) -> &Arc<TradeExecutor> {
        &self.executor
    }

    /// Submits the swap and journals it as pending. Confirmation is not tracked;
    /// pair with [`Trader::track`].
    pub async fn execute(&self, request: &TradeRequest) -> EngineResult<TradeTicket> {
        let signer = self.keystore.signer(&request.wallet).await?;
        let gas = self.gas.compute_gas(request.user_id, request.extra_gas_percent).await?;

        let submission = self
            .executor
            .swap(
                request.side,
                &signer,
                request.token,
                request.amount_in,
                request.min_amount_out,
                &gas,
            )
            .await?;

        let (native_amount_wei, token_amount_wei) = match request.side {
            TradeSide::Buy => (request.amount_in, submission.quoted_out),
            TradeSide::Sell => (submission.quoted_out, request.amount_in),
        };
        let record = NewTrade {
            user_id: request.user_id,
            wallet_address: request.wallet.address,
            token_address: request.token,
            side: request.side,
            native_amount_wei,
            token_amount_wei,
            route_key: submission.route_key.clone(),
            tx_hash: submission.tx_hash,
        };

        // The swap is already on its way, so a journal failure must not fail the trade.
        let trade = match self.trades.append(record).await {
            Ok(trade) => Some(trade),
            Err(e) => {
                error!(tx_hash = %submission.tx_hash, error = %e, "Failed to record trade");
                None
            }
        };

        Ok(TradeTicket { submission, trade })
    }

    /// Hands the ticket to the confirmation worker.
    pub fn track(&self, ticket: &TradeTicket, request: &TradeRequest, job: Option<ConfirmationJob>) -> EngineResult<()> {
        let job = job
            .unwrap_or_else(|| ConfirmationJob::new(request.user_id, ticket.submission.tx_hash, describe(request)))
            .for_trade(ticket.trade.as_ref().map(|t| t.id));
        self.confirmations.enqueue(job)
    }

    /// Execute and track in one step, for direct user trades.
    pub async fn submit(&self, request: &TradeRequest) -> EngineResult<TradeTicket> {
        let ticket = self.execute(request).await?;
        self.track(&ticket, request, None)?;
        Ok(ticket)
    }
}

pub fn describe(request: &TradeRequest) -> String {
    let side = match request.side {
        TradeSide::Buy => "Buy",
        TradeSide::Sell => "Sell",
    };
    format!("{} of {:#x}", side, request.token)
}
