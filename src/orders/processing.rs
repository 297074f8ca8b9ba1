//! In-flight order markers

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::warn;
use crate::types::OrderId;

/// Orders currently being dispatched. A claimed order is skipped by every
/// other tick until it is released or its marker goes stale.
#[derive(Default)]
pub struct ProcessingSet {
    claims: Mutex<HashMap<OrderId, Instant>>,
}

impl ProcessingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `order_id`, returning false when someone already holds it.
    pub async fn try_claim(&self, order_id: OrderId) -> bool {
        let mut claims = self.claims.lock().await;
        if claims.contains_key(&order_id) {
            return false;
        }
        claims.insert(order_id, Instant::now());
        true
    }

    pub async fn release(&self, order_id: OrderId) {
        self.claims.lock().await.remove(&order_id);
    }

    pub async fn contains(&self, order_id: OrderId) -> bool {
        self.claims.lock().await.contains_key(&order_id)
    }

    pub async fn len(&self) -> usize {
        self.claims.lock().await.len()
    }

    /// Drops markers older than `ttl`, returning the orders that were freed.
    pub async fn sweep_stale(&self, ttl: Duration) -> Vec<OrderId> {
        let mut claims = self.claims.lock().await;
        let stale: Vec<OrderId> = claims
            .iter()
            .filter(|(_, claimed_at)| claimed_at.elapsed() >= ttl)
            .map(|(id, _)| *id)
            .collect();

        for order_id in &stale {
            claims.remove(order_id);
            warn!(order_id, "⚠️ Releasing stale processing marker");
        }
        stale
    }
}

/// Orders that were already told their market cap is unknown.
#[derive(Default)]
pub struct NoticeLedger {
    notified: Mutex<HashSet<OrderId>>,
}

impl NoticeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// True the first time it is called for `order_id`.
    pub async fn first_notice(&self, order_id: OrderId) -> bool {
        self.notified.lock().await.insert(order_id)
    }

    pub async fn forget(&self, order_id: OrderId) {
        self.notified.lock().await.remove(&order_id);
    }
}
