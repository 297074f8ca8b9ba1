//! Limit order persistence

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::{debug, info};
use crate::{
    errors::{EngineError, EngineResult},
    types::{LimitOrder, NewLimitOrder, OrderId, OrderStatus, OrderTransition, UserId},
};

#[async_trait]
pub trait LimitOrderStore: Send + Sync {
    async fn insert(&self, order: NewLimitOrder) -> EngineResult<LimitOrder>;

    async fn get(&self, order_id: OrderId) -> EngineResult<Option<LimitOrder>>;

    async fn open_orders(&self) -> EngineResult<Vec<LimitOrder>>;

    async fn orders_for_user(&self, user_id: UserId) -> EngineResult<Vec<LimitOrder>>;

    /// Applies `transition` if the order is still OPEN. Returns the updated
    /// order, or `None` when the order is missing or already terminal.
    async fn transition(&self, order_id: OrderId, transition: OrderTransition) -> EngineResult<Option<LimitOrder>>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct OrderBook {
    next_id: OrderId,
    orders: BTreeMap<OrderId, LimitOrder>,
}

/// Order store persisted as a single JSON snapshot, rewritten on every change.
pub struct JsonOrderStore {
    path: Option<PathBuf>,
    book: Mutex<OrderBook>,
}

impl JsonOrderStore {
    pub fn in_memory() -> Self {
        Self { path: None, book: Mutex::new(OrderBook::default()) }
    }

    pub fn open(path: impl Into<PathBuf>) -> EngineResult<Self> {
        let path = path.into();
        let book = if path.exists() {
            let raw = fs::read_to_string(&path)
                .map_err(|e| EngineError::storage(format!("read {}", path.display()), e))?;
            let book: OrderBook = serde_json::from_str(&raw)
                .map_err(|e| EngineError::storage("decode order book", e))?;
            info!(orders = book.orders.len(), path = %path.display(), "Loaded limit orders");
            book
        } else {
            OrderBook::default()
        };
        Ok(Self { path: Some(path), book: Mutex::new(book) })
    }

    fn persist(&self, book: &OrderBook) -> EngineResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let raw = serde_json::to_string_pretty(book)
            .map_err(|e| EngineError::storage("encode order book", e))?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, raw).map_err(|e| EngineError::storage(format!("write {}", tmp.display()), e))?;
        fs::rename(&tmp, path).map_err(|e| EngineError::storage(format!("replace {}", path.display()), e))
    }
}

#[async_trait]
impl LimitOrderStore for JsonOrderStore {
    async fn insert(&self, order: NewLimitOrder) -> EngineResult<LimitOrder> {
        let mut book = self.book.lock().await;
        book.next_id += 1;
        let now = Utc::now();

        let order = LimitOrder {
            id: book.next_id,
            user_id: order.user_id,
            wallet_id: order.wallet_id,
            token_address: order.token_address,
            side: order.side,
            amount_native_wei: order.amount_native_wei,
            sell_percent: order.sell_percent,
            trigger_type: order.trigger_type,
            trigger_value: order.trigger_value,
            status: OrderStatus::Open,
            last_error: None,
            tx_hash: None,
            created_at: now,
            updated_at: now,
        };
        book.orders.insert(order.id, order.clone());
        if let Err(e) = self.persist(&book) {
            book.orders.remove(&order.id);
            book.next_id -= 1;
            return Err(e);
        }
        Ok(order)
    }

    async fn get(&self, order_id: OrderId) -> EngineResult<Option<LimitOrder>> {
        Ok(self.book.lock().await.orders.get(&order_id).cloned())
    }

    async fn open_orders(&self) -> EngineResult<Vec<LimitOrder>> {
        Ok(self
            .book
            .lock()
            .await
            .orders
            .values()
            .filter(|o| o.status == OrderStatus::Open)
            .cloned()
            .collect())
    }

    async fn orders_for_user(&self, user_id: UserId) -> EngineResult<Vec<LimitOrder>> {
        Ok(self
            .book
            .lock()
            .await
            .orders
            .values()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn transition(&self, order_id: OrderId, transition: OrderTransition) -> EngineResult<Option<LimitOrder>> {
        let mut book = self.book.lock().await;
        let Some(order) = book.orders.get_mut(&order_id) else {
            return Ok(None);
        };
        if order.status != OrderStatus::Open {
            debug!(order_id, status = ?order.status, target = ?transition.target(), "Ignoring transition out of terminal state");
            return Ok(None);
        }

        let previous = order.clone();
        order.status = transition.target();
        order.updated_at = Utc::now();
        match transition {
            OrderTransition::Filled { tx_hash } => order.tx_hash = Some(tx_hash),
            OrderTransition::Failed { message } => order.last_error = Some(message),
            OrderTransition::Cancelled => {}
        }
        let updated = order.clone();
        if let Err(e) = self.persist(&book) {
            book.orders.insert(order_id, previous);
            return Err(e);
        }
        Ok(Some(updated))
    }
}
