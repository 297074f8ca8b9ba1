//! Background confirmation tracking for submitted trades

use alloy::primitives::B256;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use crate::{
    errors::{EngineError, EngineResult},
    network::{ChainClient, Confirmation},
    orders::ProcessingSet,
    services::{NotificationSink, notify_quietly},
    storage::TradeLog,
    types::{OrderId, TradeId, TradeStatus, UserId},
};

#[derive(Debug, Clone)]
pub struct ConfirmationJob {
    pub id: Uuid,
    pub user_id: UserId,
    pub tx_hash: B256,
    pub trade_id: Option<TradeId>,
    /// Limit order whose processing marker is released once the job ends.
    pub order_id: Option<OrderId>,
    pub label: String,
}

impl ConfirmationJob {
    pub fn new(user_id: UserId, tx_hash: B256, label: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            tx_hash,
            trade_id: None,
            order_id: None,
            label: label.into(),
        }
    }

    pub fn for_trade(mut self, trade_id: Option<TradeId>) -> Self {
        self.trade_id = trade_id;
        self
    }

    pub fn for_order(mut self, order_id: OrderId) -> Self {
        self.order_id = Some(order_id);
        self
    }
}

/// A job whose confirmation could not be established or whose transaction reverted.
#[derive(Debug)]
pub struct ConfirmationFailure {
    pub job: ConfirmationJob,
    pub error: EngineError,
}

/// Sending half handed to everything that submits transactions.
#[derive(Clone)]
pub struct ConfirmationQueue {
    sender: mpsc::UnboundedSender<ConfirmationJob>,
}

impl ConfirmationQueue {
    pub fn enqueue(&self, job: ConfirmationJob) -> EngineResult<()> {
        self.sender.send(job).map_err(|e| EngineError::SubmissionFailed {
            message: format!("confirmation worker stopped, {} left untracked", e.0.tx_hash),
            source: None,
        })
    }
}

#[derive(Clone)]
pub struct ConfirmationWorker {
    chain: Arc<dyn ChainClient>,
    trades: Arc<dyn TradeLog>,
    notifier: Arc<dyn NotificationSink>,
    processing: Arc<ProcessingSet>,
    timeout: Duration,
    failures: mpsc::UnboundedSender<ConfirmationFailure>,
}

impl ConfirmationWorker {
    /// Returns the worker and the receiving end of its failure channel.
    pub fn new(
        chain: Arc<dyn ChainClient>,
        trades: Arc<dyn TradeLog>,
        notifier: Arc<dyn NotificationSink>,
        processing: Arc<ProcessingSet>,
        timeout: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<ConfirmationFailure>) {
        let (failures, failure_rx) = mpsc::unbounded_channel();
        let worker = Self {
            chain,
            trades,
            notifier,
            processing,
            timeout,
            failures,
        };
        (worker, failure_rx)
    }

    /// Starts the job loop. Each job is awaited on its own task so a slow
    /// receipt never holds up the others.
    pub fn spawn(self) -> (ConfirmationQueue, JoinHandle<()>) {
        let (sender, mut jobs) = mpsc::unbounded_channel::<ConfirmationJob>();
        let handle = tokio::spawn(async move {
            while let Some(job) = jobs.recv().await {
                let worker = self.clone();
                tokio::spawn(async move { worker.process(job).await });
            }
            debug!("Confirmation queue closed");
        });
        (ConfirmationQueue { sender }, handle)
    }

    async fn process(&self, job: ConfirmationJob) {
        let result = self.confirm(&job).await;

        if let Some(order_id) = job.order_id {
            self.processing.release(order_id).await;
        }

        if let Err(error) = result {
            error!(job = %job.id, tx_hash = %job.tx_hash, error = %error, "❌ Confirmation failed");
            if self.failures.send(ConfirmationFailure { job, error }).is_err() {
                debug!("No listener for confirmation failures");
            }
        }
    }

    async fn confirm(&self, job: &ConfirmationJob) -> EngineResult<Confirmation> {
        let outcome = self.chain.wait_for_confirmation(job.tx_hash, self.timeout).await;

        let confirmation = match outcome {
            Ok(confirmation) => confirmation,
            Err(e) => {
                warn!(tx_hash = %job.tx_hash, error = %e, "⚠️ Trade left pending");
                notify_quietly(
                    self.notifier.as_ref(),
                    job.user_id,
                    &format!("⏳ {} not confirmed yet: {}", job.label, job.tx_hash),
                )
                .await;
                return Err(e);
            }
        };

        let status = if confirmation.success {
            TradeStatus::Confirmed
        } else {
            TradeStatus::Reverted
        };
        if let Some(trade_id) = job.trade_id {
            if let Err(e) = self.trades.settle(trade_id, status).await {
                error!(trade_id, error = %e, "Failed to settle trade");
            }
        }

        if confirmation.success {
            info!(tx_hash = %job.tx_hash, block = ?confirmation.block_number, "✅ Trade confirmed");
            notify_quietly(
                self.notifier.as_ref(),
                job.user_id,
                &format!("✅ {} confirmed: {}", job.label, job.tx_hash),
            )
            .await;
            Ok(confirmation)
        } else {
            notify_quietly(
                self.notifier.as_ref(),
                job.user_id,
                &format!("❌ {} reverted: {}", job.label, job.tx_hash),
            )
            .await;
            Err(EngineError::Reverted { tx_hash: job.tx_hash })
        }
    }
}
