//! Swap Engine - Main Entry Point
//!
//! Wires the chain client, stores and engine together and runs the limit
//! order loop until Ctrl+C.

use swap_engine::*;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn, error};
use swap_engine::{
    execution::{ConfirmationWorker, GasEstimator, TradeExecutor, Trader},
    ledger::CostBasisLedger,
    network::{
        BalanceView, ChainClient, DexScreenerFeed, MarketDataFeed, NoMarketData, RpcChainClient,
        balance_with_timeout, chain_slug,
    },
    orders::{EngineParts, LimitOrderEngine, ProcessingSet},
    routing::{PriceOracle, RouteQuoter},
    services::{EnvKeyStore, KeyStore, LogNotifier, NotificationSink, StaticGasSettings},
    storage::{JsonOrderStore, JsonlTradeLog, LimitOrderStore, TradeLog},
    utils::{NATIVE_DECIMALS, units_to_decimal},
};

const OWNER_WALLET_ID: WalletId = 1;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Load configuration
    let config = CONFIG.clone();

    // Initialize logging
    utils::setup_output_directories(&config.data_dir)?;
    let _logging_guard = utils::setup_logging(&config.data_dir)?;

    info!("🔁 Swap Engine v{}", env!("CARGO_PKG_VERSION"));
    info!("📋 Configuration:");
    info!("   Chain ID: {}", config.chain_id);
    info!("   Routes: {}", config.routes.iter().map(RouteConfig::key).collect::<Vec<_>>().join(", "));
    info!("   Limit Order Interval: {} ms", config.limit_order_interval_ms);
    info!("   Swap Deadline: {} s", config.swap_deadline_secs);
    info!("   Default Gas Boost: +{} gwei, +{}%", config.default_gas_flat_gwei, config.default_gas_percent);
    info!("   Data Directory: {}", config.data_dir.display());

    // Validate configuration
    config.validate()?;

    // Setup network access
    let chain: Arc<dyn ChainClient> = Arc::new(RpcChainClient::connect(&config).await?);
    let quoter = Arc::new(RouteQuoter::new(Arc::clone(&chain), &config));
    let market_data: Arc<dyn MarketDataFeed> =
        match DexScreenerFeed::new(&config.market_data_url, chain_slug(config.chain_id)) {
            Ok(feed) => Arc::new(feed),
            Err(e) => {
                warn!("⚠️ Market data disabled: {}", e);
                Arc::new(NoMarketData)
            }
        };
    let prices = Arc::new(PriceOracle::new(Arc::clone(&chain), Arc::clone(&quoter), market_data));

    // Persistent stores
    let trades: Arc<dyn TradeLog> =
        Arc::new(JsonlTradeLog::open(config.data_dir.join("trades").join("trades.jsonl"))?);
    let orders: Arc<dyn LimitOrderStore> =
        Arc::new(JsonOrderStore::open(config.data_dir.join("orders").join("orders.json"))?);

    // Wallets
    let mut keystore = EnvKeyStore::new();
    match &config.private_key {
        Some(key) => keystore = keystore.with_key(OWNER_WALLET_ID, config.owner_user_id, key)?,
        None => warn!("⚠️ PRIVATE_KEY not set, orders will fail with no wallet"),
    }
    let keystore: Arc<dyn KeyStore> = Arc::new(keystore);

    // Execution pipeline
    let gas_settings = Arc::new(StaticGasSettings::new(GasSettings {
        flat_gwei: config.default_gas_flat_gwei,
        percent: config.default_gas_percent,
        gas_limit: None,
    }));
    let gas = Arc::new(GasEstimator::new(Arc::clone(&chain), gas_settings, config.default_gas_limit));
    let executor = Arc::new(TradeExecutor::new(
        Arc::clone(&chain),
        Arc::clone(&quoter),
        Duration::from_secs(config.swap_deadline_secs),
    ));
    let notifier: Arc<dyn NotificationSink> = Arc::new(LogNotifier);
    let processing = Arc::new(ProcessingSet::new());

    let (worker, mut failures) = ConfirmationWorker::new(
        Arc::clone(&chain),
        Arc::clone(&trades),
        Arc::clone(&notifier),
        Arc::clone(&processing),
        config.confirmation_timeout(),
    );
    let (confirmations, worker_handle) = worker.spawn();
    tokio::spawn(async move {
        while let Some(failure) = failures.recv().await {
            warn!(
                job = %failure.job.id,
                tx_hash = %failure.job.tx_hash,
                "⚠️ {} unresolved: {}",
                failure.job.label,
                failure.error
            );
        }
    });

    let trader = Arc::new(Trader::new(
        Arc::clone(&keystore),
        gas,
        executor,
        Arc::clone(&trades),
        confirmations,
    ));
    let ledger = Arc::new(CostBasisLedger::new(Arc::clone(&trades)));

    let engine = Arc::new(LimitOrderEngine::new(
        EngineParts {
            orders: Arc::clone(&orders),
            keystore: Arc::clone(&keystore),
            chain: Arc::clone(&chain),
            trader,
            prices: Arc::clone(&prices),
            ledger,
            notifier,
            processing,
        },
        &config,
    ));

    print_startup_state(&config, chain.as_ref(), keystore.as_ref(), prices.as_ref(), orders.as_ref()).await;

    // Setup shutdown handler
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let engine_handle = Arc::clone(&engine).start(shutdown_rx);

    tokio::signal::ctrl_c().await?;
    info!("\n📛 Received shutdown signal (Ctrl+C)...");
    if shutdown_tx.send(true).is_err() {
        warn!("Limit order engine already stopped");
    }
    if let Err(e) = engine_handle.await {
        error!("Limit order engine task failed: {}", e);
    }
    worker_handle.abort();

    match orders.open_orders().await {
        Ok(open) => info!("📊 {} limit orders still open", open.len()),
        Err(e) => warn!("⚠️ Could not read open orders: {}", e),
    }
    info!("👋 Shutdown complete");

    Ok(())
}

async fn print_startup_state(
    config: &Config,
    chain: &dyn ChainClient,
    keystore: &dyn KeyStore,
    prices: &PriceOracle,
    orders: &dyn LimitOrderStore,
) {
    match prices.native_usd_price().await {
        Some(usd) => info!("💵 Native price: ${:.2}", usd),
        None => warn!("⚠️ Native/USD price unavailable"),
    }

    if let Ok(Some(wallet)) = keystore.wallet(OWNER_WALLET_ID).await {
        match balance_with_timeout(chain, wallet.address, None, config.balance_timeout()).await {
            BalanceView::Available(wei) => info!(
                "👛 Wallet {}: {} native",
                wallet.address,
                units_to_decimal(wei, NATIVE_DECIMALS).normalize()
            ),
            BalanceView::Unavailable => warn!("👛 Wallet {}: balance unavailable", wallet.address),
        }
    }

    match orders.open_orders().await {
        Ok(open) => info!("📋 {} open limit orders loaded", open.len()),
        Err(e) => error!("Failed to load limit orders: {}", e),
    }
}
