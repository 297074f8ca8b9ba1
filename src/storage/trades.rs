//! Append-only trade log

use alloy::primitives::Address;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::{info, warn};
use crate::{
    errors::{EngineError, EngineResult},
    types::{NewTrade, Trade, TradeId, TradeStatus, UserId},
};

#[async_trait]
pub trait TradeLog: Send + Sync {
    /// Records a submitted trade as `Pending` and assigns the next id.
    async fn append(&self, trade: NewTrade) -> EngineResult<Trade>;

    /// Settles a pending trade. Already settled trades are left alone.
    async fn settle(&self, trade_id: TradeId, status: TradeStatus) -> EngineResult<()>;

    /// All trades for the pair in insertion order.
    async fn trades_for(&self, user_id: UserId, token: Address) -> EngineResult<Vec<Trade>>;
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum TradeLogEntry {
    Recorded(Trade),
    Settled { trade_id: TradeId, status: TradeStatus },
}

/// Trade log journaled to a JSON-lines file, mirrored in memory.
pub struct JsonlTradeLog {
    path: Option<PathBuf>,
    trades: Mutex<Vec<Trade>>,
}

impl JsonlTradeLog {
    pub fn in_memory() -> Self {
        Self { path: None, trades: Mutex::new(Vec::new()) }
    }

    /// Opens the journal at `path`, replaying any existing entries.
    pub fn open(path: impl Into<PathBuf>) -> EngineResult<Self> {
        let path = path.into();
        let mut trades = Vec::new();

        if path.exists() {
            let file = fs::File::open(&path)
                .map_err(|e| EngineError::storage(format!("open {}", path.display()), e))?;
            for (line_no, line) in BufReader::new(file).lines().enumerate() {
                let line = line.map_err(|e| EngineError::storage("read trade log", e))?;
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<TradeLogEntry>(&line) {
                    Ok(entry) => apply(&mut trades, entry),
                    Err(e) => warn!("⚠️ Skipping corrupt trade log line {}: {}", line_no + 1, e),
                }
            }
            info!(trades = trades.len(), path = %path.display(), "Loaded trade log");
        }

        Ok(Self { path: Some(path), trades: Mutex::new(trades) })
    }

    fn journal(&self, entry: &TradeLogEntry) -> EngineResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| EngineError::storage(format!("open {}", path.display()), e))?;

        let line = serde_json::to_string(entry).map_err(|e| EngineError::storage("encode trade", e))?;
        writeln!(file, "{}", line).map_err(|e| EngineError::storage("append trade", e))
    }
}

fn apply(trades: &mut Vec<Trade>, entry: TradeLogEntry) {
    match entry {
        TradeLogEntry::Recorded(trade) => trades.push(trade),
        TradeLogEntry::Settled { trade_id, status } => {
            if let Some(trade) = trades.iter_mut().find(|t| t.id == trade_id) {
                if trade.status == TradeStatus::Pending {
                    trade.status = status;
                }
            }
        }
    }
}

#[async_trait]
impl TradeLog for JsonlTradeLog {
    async fn append(&self, trade: NewTrade) -> EngineResult<Trade> {
        let mut trades = self.trades.lock().await;
        let id = trades.last().map(|t| t.id + 1).unwrap_or(1);

        let trade = Trade {
            id,
            user_id: trade.user_id,
            wallet_address: trade.wallet_address,
            token_address: trade.token_address,
            side: trade.side,
            native_amount_wei: trade.native_amount_wei,
            token_amount_wei: trade.token_amount_wei,
            route_key: trade.route_key,
            tx_hash: trade.tx_hash,
            status: TradeStatus::Pending,
            created_at: Utc::now(),
        };

        self.journal(&TradeLogEntry::Recorded(trade.clone()))?;
        trades.push(trade.clone());

        info!(
            trade_id = trade.id,
            side = ?trade.side,
            token = %trade.token_address,
            route = %trade.route_key,
            "Recorded pending trade"
        );
        Ok(trade)
    }

    async fn settle(&self, trade_id: TradeId, status: TradeStatus) -> EngineResult<()> {
        let mut trades = self.trades.lock().await;
        let pending = trades
            .iter()
            .any(|t| t.id == trade_id && t.status == TradeStatus::Pending);
        if !pending || status == TradeStatus::Pending {
            return Ok(());
        }

        let entry = TradeLogEntry::Settled { trade_id, status };
        self.journal(&entry)?;
        apply(&mut trades, entry);
        Ok(())
    }

    async fn trades_for(&self, user_id: UserId, token: Address) -> EngineResult<Vec<Trade>> {
        let trades = self.trades.lock().await;
        let mut matching: Vec<Trade> = trades
            .iter()
            .filter(|t| t.user_id == user_id && t.token_address == token)
            .cloned()
            .collect();
        matching.sort_by_key(|t| t.id);
        Ok(matching)
    }
}
