//! Limit order scheduler: scans OPEN orders and fires the ones whose trigger is met

use alloy::primitives::{Address, U256};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, error, info, warn};
use crate::{
    config::{Config, MAX_ERROR_MESSAGE_LEN},
    errors::{EngineError, EngineResult},
    execution::{ConfirmationJob, TradeRequest, Trader},
    ledger::CostBasisLedger,
    network::{ChainClient, token_balance, with_timeout},
    orders::{NoticeLedger, ProcessingSet, SkipReason, TriggerOutcome, evaluate},
    routing::PriceOracle,
    services::{KeyStore, NotificationSink, notify_quietly},
    storage::LimitOrderStore,
    types::{
        LimitOrder, NewLimitOrder, OrderId, OrderStatus, OrderTransition, TokenPrices, TradeSide,
        TriggerType, UserId,
    },
    utils::truncate_message,
};

/// Collaborators the engine drives. `processing` is shared with the
/// confirmation worker, which releases markers once a fill settles.
pub struct EngineParts {
    pub orders: Arc<dyn LimitOrderStore>,
    pub keystore: Arc<dyn KeyStore>,
    pub chain: Arc<dyn ChainClient>,
    pub trader: Arc<Trader>,
    pub prices: Arc<PriceOracle>,
    pub ledger: Arc<CostBasisLedger>,
    pub notifier: Arc<dyn NotificationSink>,
    pub processing: Arc<ProcessingSet>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickSummary {
    pub scanned: usize,
    pub fired: usize,
    pub skipped: usize,
    pub failed: usize,
}

enum Evaluation {
    Fired,
    Skipped,
    Failed,
}

enum Dispatch {
    Submitted,
    /// Nothing was sent; the order stays OPEN for the next tick.
    Deferred,
}

pub struct LimitOrderEngine {
    orders: Arc<dyn LimitOrderStore>,
    keystore: Arc<dyn KeyStore>,
    chain: Arc<dyn ChainClient>,
    trader: Arc<Trader>,
    prices: Arc<PriceOracle>,
    ledger: Arc<CostBasisLedger>,
    notifier: Arc<dyn NotificationSink>,
    processing: Arc<ProcessingSet>,
    notices: NoticeLedger,
    interval: Duration,
    processing_ttl: Duration,
    balance_timeout: Duration,
}

impl LimitOrderEngine {
    pub fn new(parts: EngineParts, config: &Config) -> Self {
        Self {
            orders: parts.orders,
            keystore: parts.keystore,
            chain: parts.chain,
            trader: parts.trader,
            prices: parts.prices,
            ledger: parts.ledger,
            notifier: parts.notifier,
            processing: parts.processing,
            notices: NoticeLedger::new(),
            interval: config.limit_order_interval(),
            processing_ttl: config.processing_ttl(),
            balance_timeout: config.balance_timeout(),
        }
    }

    pub fn processing(&self) -> &Arc<ProcessingSet> {
        &self.processing
    }

    pub async fn create_order(&self, order: NewLimitOrder) -> EngineResult<LimitOrder> {
        validate_new_order(&order)?;

        let wallet = self
            .keystore
            .wallet(order.wallet_id)
            .await?
            .filter(|w| w.user_id == order.user_id)
            .ok_or(EngineError::WalletNotFound { wallet_id: order.wallet_id })?;

        let created = self.orders.insert(order).await?;
        info!(
            order_id = created.id,
            user_id = created.user_id,
            wallet = %wallet.address,
            token = %created.token_address,
            side = ?created.side,
            trigger = ?created.trigger_type,
            value = %created.trigger_value,
            "📋 Limit order created"
        );
        Ok(created)
    }

    /// Cancels an OPEN order that is not mid-execution. Anything else is
    /// rejected and the stored order is left untouched.
    pub async fn cancel_order(&self, user_id: UserId, order_id: OrderId) -> EngineResult<LimitOrder> {
        let order = self
            .orders
            .get(order_id)
            .await?
            .filter(|o| o.user_id == user_id)
            .ok_or(EngineError::OrderNotFound { order_id })?;

        if order.status != OrderStatus::Open {
            return Err(EngineError::InvalidTransition {
                order_id,
                status: order.status,
                reason: "only open orders can be cancelled".to_string(),
            });
        }

        // Holding the claim keeps a concurrent tick from firing mid-cancel.
        if !self.processing.try_claim(order_id).await {
            return Err(EngineError::InvalidTransition {
                order_id,
                status: order.status,
                reason: "order is being executed".to_string(),
            });
        }
        let result = self.orders.transition(order_id, OrderTransition::Cancelled).await;
        self.processing.release(order_id).await;

        match result? {
            Some(cancelled) => {
                self.notices.forget(order_id).await;
                info!(order_id, user_id, "🛑 Limit order cancelled");
                Ok(cancelled)
            }
            None => {
                let status = self
                    .orders
                    .get(order_id)
                    .await?
                    .map(|o| o.status)
                    .unwrap_or(order.status);
                Err(EngineError::InvalidTransition {
                    order_id,
                    status,
                    reason: "order left the open state".to_string(),
                })
            }
        }
    }

    pub async fn orders_for_user(&self, user_id: UserId) -> EngineResult<Vec<LimitOrder>> {
        self.orders.orders_for_user(user_id).await
    }

    /// One sequential pass over every OPEN order.
    pub async fn tick(&self) -> EngineResult<TickSummary> {
        self.processing.sweep_stale(self.processing_ttl).await;

        let open = self.orders.open_orders().await?;
        let mut summary = TickSummary {
            scanned: open.len(),
            ..Default::default()
        };
        if open.is_empty() {
            return Ok(summary);
        }

        let needs_usd = open
            .iter()
            .any(|o| matches!(o.trigger_type, TriggerType::UsdPrice | TriggerType::MarketCap));
        let native_usd = if needs_usd { self.prices.native_usd_price().await } else { None };
        let mut price_cache: HashMap<Address, TokenPrices> = HashMap::new();

        for order in open {
            if self.processing.contains(order.id).await {
                summary.skipped += 1;
                continue;
            }

            let prices = match price_cache.get(&order.token_address) {
                Some(cached) => cached.clone(),
                None => {
                    let resolved = self.prices.token_prices(order.token_address, native_usd).await;
                    price_cache.insert(order.token_address, resolved.clone());
                    resolved
                }
            };

            match self.process_order(&order, &prices).await {
                Evaluation::Fired => summary.fired += 1,
                Evaluation::Skipped => summary.skipped += 1,
                Evaluation::Failed => summary.failed += 1,
            }
        }

        if summary.fired > 0 || summary.failed > 0 {
            info!(
                scanned = summary.scanned,
                fired = summary.fired,
                failed = summary.failed,
                "📊 Limit order tick complete"
            );
        }
        Ok(summary)
    }

    async fn process_order(&self, order: &LimitOrder, prices: &TokenPrices) -> Evaluation {
        let basis = match (order.trigger_type, prices.decimals) {
            (TriggerType::Multiple, Some(decimals)) => {
                match self.ledger.average_entry(order.user_id, order.token_address, decimals).await {
                    Ok(basis) => basis,
                    Err(e) => {
                        warn!(order_id = order.id, error = %e, "⚠️ Cost basis unavailable");
                        return Evaluation::Skipped;
                    }
                }
            }
            _ => None,
        };

        match evaluate(order, prices, basis.as_ref()) {
            TriggerOutcome::Fire { observed, threshold } => {
                debug!(order_id = order.id, %observed, %threshold, "Trigger met");
            }
            TriggerOutcome::Hold => return Evaluation::Skipped,
            TriggerOutcome::Skip(reason) => {
                self.on_skip(order, reason).await;
                return Evaluation::Skipped;
            }
        }

        if !self.processing.try_claim(order.id).await {
            return Evaluation::Skipped;
        }
        // A racing tick may have filled the order between our scan and the claim.
        match self.orders.get(order.id).await {
            Ok(Some(current)) if current.status == OrderStatus::Open => {}
            _ => {
                self.processing.release(order.id).await;
                return Evaluation::Skipped;
            }
        }

        match self.dispatch(order).await {
            Ok(Dispatch::Submitted) => Evaluation::Fired,
            Ok(Dispatch::Deferred) => {
                self.processing.release(order.id).await;
                Evaluation::Skipped
            }
            Err(e) => {
                self.fail(order, &e).await;
                Evaluation::Failed
            }
        }
    }

    async fn on_skip(&self, order: &LimitOrder, reason: SkipReason) {
        debug!(order_id = order.id, ?reason, "Order skipped");
        if reason == SkipReason::NoMarketCap && self.notices.first_notice(order.id).await {
            notify_quietly(
                self.notifier.as_ref(),
                order.user_id,
                &format!(
                    "ℹ️ Limit order #{}: market cap for {:#x} is unavailable, will keep checking",
                    order.id, order.token_address
                ),
            )
            .await;
        }
    }

    /// Errors returned from here always happened before anything was submitted.
    async fn dispatch(&self, order: &LimitOrder) -> EngineResult<Dispatch> {
        let wallet = self
            .keystore
            .wallet(order.wallet_id)
            .await?
            .ok_or(EngineError::WalletNotFound { wallet_id: order.wallet_id })?;

        let amount_in = match order.side {
            TradeSide::Buy => order
                .amount_native_wei
                .filter(|amount| !amount.is_zero())
                .ok_or_else(|| invalid("buy amount is zero"))?,
            TradeSide::Sell => {
                let read = token_balance(self.chain.as_ref(), order.token_address, wallet.address);
                let balance = match with_timeout("balance read", self.balance_timeout, read).await {
                    Ok(balance) => balance,
                    Err(EngineError::Timeout { .. }) => {
                        warn!(order_id = order.id, "⏳ Balance read timed out, retrying next tick");
                        return Ok(Dispatch::Deferred);
                    }
                    Err(e) => return Err(e),
                };
                let percent = U256::from(order.sell_percent.unwrap_or(0));
                let amount = balance.saturating_mul(percent) / U256::from(100u64);
                if amount.is_zero() {
                    return Err(invalid("computed sell amount is zero"));
                }
                amount
            }
        };

        let request = TradeRequest {
            user_id: order.user_id,
            wallet,
            side: order.side,
            token: order.token_address,
            amount_in,
            min_amount_out: U256::ZERO,
            extra_gas_percent: 0.0,
        };
        let ticket = self.trader.execute(&request).await?;
        let tx_hash = ticket.submission.tx_hash;

        // Recorded before confirmation so the order can never fire twice.
        match self.orders.transition(order.id, OrderTransition::Filled { tx_hash }).await {
            Ok(Some(_)) => {}
            Ok(None) => warn!(order_id = order.id, %tx_hash, "⚠️ Order left OPEN before fill was recorded"),
            Err(e) => error!(order_id = order.id, %tx_hash, error = %e, "Failed to record fill"),
        }
        self.notices.forget(order.id).await;

        info!(
            order_id = order.id,
            %tx_hash,
            route = %ticket.submission.route_key,
            amount_in = %amount_in,
            "🎯 Limit order fired"
        );
        notify_quietly(
            self.notifier.as_ref(),
            order.user_id,
            &format!("🎯 Limit order #{} triggered, transaction {}", order.id, tx_hash),
        )
        .await;

        let job = ConfirmationJob::new(order.user_id, tx_hash, format!("Limit order #{}", order.id))
            .for_order(order.id);
        if let Err(e) = self.trader.track(&ticket, &request, Some(job)) {
            error!(order_id = order.id, error = %e, "Confirmation not tracked");
            self.processing.release(order.id).await;
        }

        Ok(Dispatch::Submitted)
    }

    async fn fail(&self, order: &LimitOrder, cause: &EngineError) {
        let message = truncate_message(&cause.to_string(), MAX_ERROR_MESSAGE_LEN);
        error!(order_id = order.id, error = %message, "❌ Limit order failed");

        if let Err(e) = self
            .orders
            .transition(order.id, OrderTransition::Failed { message: message.clone() })
            .await
        {
            error!(order_id = order.id, error = %e, "Failed to record order error");
        }
        self.processing.release(order.id).await;
        self.notices.forget(order.id).await;

        notify_quietly(
            self.notifier.as_ref(),
            order.user_id,
            &format!("❌ Limit order #{} failed: {}", order.id, message),
        )
        .await;
    }

    /// Runs `tick` on the configured interval until `shutdown` flips to true.
    pub fn start(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = time::interval(self.interval);
            interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
            info!(interval_ms = self.interval.as_millis() as u64, "🚀 Limit order engine started");

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if let Err(e) = self.tick().await {
                            error!("Limit order tick error: {}", e);
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            info!("Limit order engine stopping");
                            break;
                        }
                    }
                }
            }
        })
    }
}

fn invalid(reason: &str) -> EngineError {
    EngineError::InvalidOrder { reason: reason.to_string() }
}

pub fn validate_new_order(order: &NewLimitOrder) -> EngineResult<()> {
    if order.trigger_value <= Decimal::ZERO {
        return Err(invalid("trigger value must be positive"));
    }
    match order.side {
        TradeSide::Buy => {
            if order.trigger_type == TriggerType::Multiple {
                return Err(invalid("multiple triggers are sell-only"));
            }
            if order.sell_percent.is_some() {
                return Err(invalid("buy orders take an amount, not a percentage"));
            }
            match order.amount_native_wei {
                Some(amount) if !amount.is_zero() => Ok(()),
                _ => Err(invalid("buy orders need a positive native amount")),
            }
        }
        TradeSide::Sell => {
            if order.amount_native_wei.is_some() {
                return Err(invalid("sell orders take a percentage, not an amount"));
            }
            match order.sell_percent {
                Some(pct) if (1..=100).contains(&pct) => Ok(()),
                _ => Err(invalid("sell percent must be between 1 and 100")),
            }
        }
    }
}
