#![allow(dead_code)]

use alloy::{
    primitives::{Address, B256, Bytes, U256, address},
    rpc::types::eth::TransactionRequest,
    signers::local::PrivateKeySigner,
    sol_types::{SolCall, SolValue},
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use swap_engine::{
    Config, EngineError, EngineResult,
    execution::{ConfirmationFailure, ConfirmationWorker, GasEstimator, TradeExecutor, Trader},
    ledger::CostBasisLedger,
    network::{ChainClient, Confirmation, IERC20, IUniswapV2Router02, MarketDataFeed, NonceTag},
    orders::{EngineParts, LimitOrderEngine, ProcessingSet},
    routing::{PriceOracle, RouteQuoter},
    services::{EnvKeyStore, KeyStore, NotificationSink, StaticGasSettings},
    storage::{JsonOrderStore, JsonlTradeLog},
    types::{FeeData, GasSettings, PairMetrics, RouteConfig, UserId, WalletRecord},
};

pub const WETH: Address = address!("4200000000000000000000000000000000000006");
pub const USDC: Address = address!("833589fCD6eDb6E08f4c7C32D4f71b54bdA02913");
pub const TOKEN: Address = address!("7777777777777777777777777777777777777777");
pub const ROUTER_A: Address = address!("000000000000000000000000000000000000000a");
pub const ROUTER_B: Address = address!("000000000000000000000000000000000000000b");

pub const USER: UserId = 7;
pub const WALLET_ID: u64 = 1;
pub const ANVIL_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

pub fn ether(n: u64) -> U256 {
    U256::from(n) * U256::from(10u64).pow(U256::from(18u64))
}

/// `milli / 1000` of one whole 18-decimal unit.
pub fn milli(n: u64) -> U256 {
    U256::from(n) * U256::from(10u64).pow(U256::from(15u64))
}

#[derive(Debug, Clone)]
pub struct SentTx {
    pub to: Option<Address>,
    pub value: U256,
    pub input: Bytes,
    pub nonce: u64,
    pub hash: B256,
}

impl SentTx {
    pub fn is_approval(&self) -> bool {
        self.input.starts_with(&IERC20::approveCall::SELECTOR)
    }
}

/// In-memory chain: routers answer `getAmountsOut` from a table keyed by
/// (router, first hop, last hop) and tokens answer ERC-20 reads.
#[derive(Default)]
pub struct FakeChain {
    quotes: Mutex<HashMap<(Address, Address, Address), U256>>,
    native_balances: Mutex<HashMap<Address, U256>>,
    token_balances: Mutex<HashMap<(Address, Address), U256>>,
    allowances: Mutex<HashMap<(Address, Address, Address), U256>>,
    sent: Mutex<Vec<SentTx>>,
    revert_all: Mutex<bool>,
    reject_sends: Mutex<bool>,
    balance_delay: Mutex<Option<Duration>>,
}

impl FakeChain {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_quote(&self, router: Address, from: Address, to: Address, out: U256) {
        self.quotes.lock().unwrap().insert((router, from, to), out);
    }

    pub fn set_native_balance(&self, owner: Address, amount: U256) {
        self.native_balances.lock().unwrap().insert(owner, amount);
    }

    pub fn set_token_balance(&self, token: Address, owner: Address, amount: U256) {
        self.token_balances.lock().unwrap().insert((token, owner), amount);
    }

    pub fn set_allowance(&self, token: Address, owner: Address, spender: Address, amount: U256) {
        self.allowances.lock().unwrap().insert((token, owner, spender), amount);
    }

    pub fn revert_all(&self, revert: bool) {
        *self.revert_all.lock().unwrap() = revert;
    }

    pub fn reject_sends(&self, reject: bool) {
        *self.reject_sends.lock().unwrap() = reject;
    }

    pub fn delay_balances(&self, delay: Duration) {
        *self.balance_delay.lock().unwrap() = Some(delay);
    }

    pub fn sent(&self) -> Vec<SentTx> {
        self.sent.lock().unwrap().clone()
    }

    pub fn swaps(&self) -> Vec<SentTx> {
        self.sent().into_iter().filter(|tx| !tx.is_approval()).collect()
    }

    fn revert(contract: Address) -> EngineError {
        EngineError::Contract {
            contract,
            message: "execution reverted".to_string(),
            source: anyhow::anyhow!("revert"),
        }
    }
}

#[async_trait]
impl ChainClient for FakeChain {
    async fn get_balance(&self, address: Address) -> EngineResult<U256> {
        Ok(self.native_balances.lock().unwrap().get(&address).copied().unwrap_or_default())
    }

    async fn get_fee_data(&self) -> EngineResult<FeeData> {
        Ok(FeeData {
            max_fee_per_gas: 10_000_000_000,
            max_priority_fee_per_gas: 1_000_000_000,
        })
    }

    async fn call(&self, to: Address, data: Bytes) -> EngineResult<Bytes> {
        if let Ok(call) = IUniswapV2Router02::getAmountsOutCall::abi_decode(&data, true) {
            let (Some(first), Some(last)) = (call.path.first(), call.path.last()) else {
                return Err(Self::revert(to));
            };
            let out = self.quotes.lock().unwrap().get(&(to, *first, *last)).copied();
            let out = out.ok_or_else(|| Self::revert(to))?;
            let mut amounts = vec![call.amountIn; call.path.len() - 1];
            amounts.push(out);
            return Ok(amounts.abi_encode().into());
        }
        if let Ok(call) = IERC20::balanceOfCall::abi_decode(&data, true) {
            let delay = *self.balance_delay.lock().unwrap();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            let balance = self.token_balances.lock().unwrap().get(&(to, call.account)).copied();
            return Ok(balance.unwrap_or_default().abi_encode().into());
        }
        if IERC20::decimalsCall::abi_decode(&data, true).is_ok() {
            return Ok(IERC20::decimalsCall::abi_encode_returns(&(18u8,)).into());
        }
        if IERC20::totalSupplyCall::abi_decode(&data, true).is_ok() {
            return Ok(ether(1_000_000).abi_encode().into());
        }
        if let Ok(call) = IERC20::allowanceCall::abi_decode(&data, true) {
            let allowance = self.allowances.lock().unwrap().get(&(to, call.owner, call.spender)).copied();
            return Ok(allowance.unwrap_or_default().abi_encode().into());
        }
        Err(Self::revert(to))
    }

    async fn get_transaction_count(&self, _address: Address, _tag: NonceTag) -> EngineResult<u64> {
        Ok(self.sent.lock().unwrap().len() as u64)
    }

    async fn send_transaction(&self, _signer: &PrivateKeySigner, tx: TransactionRequest) -> EngineResult<B256> {
        if *self.reject_sends.lock().unwrap() {
            return Err(EngineError::SubmissionFailed {
                message: "nonce too low".to_string(),
                source: None,
            });
        }
        let mut sent = self.sent.lock().unwrap();
        let count = sent.len() as u64;
        let hash = B256::from(U256::from(count + 1));
        sent.push(SentTx {
            to: tx.to.and_then(|kind| kind.to().copied()),
            value: tx.value.unwrap_or_default(),
            input: tx.input.input().cloned().unwrap_or_default(),
            nonce: tx.nonce.unwrap_or(count),
            hash,
        });
        Ok(hash)
    }

    async fn wait_for_confirmation(&self, tx_hash: B256, _timeout: Duration) -> EngineResult<Confirmation> {
        Ok(Confirmation {
            tx_hash,
            success: !*self.revert_all.lock().unwrap(),
            block_number: Some(1),
        })
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<(UserId, String)>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().iter().map(|(_, m)| m.clone()).collect()
    }

    pub fn containing(&self, needle: &str) -> usize {
        self.messages().iter().filter(|m| m.contains(needle)).count()
    }
}

#[async_trait]
impl NotificationSink for RecordingNotifier {
    async fn notify(&self, user_id: UserId, text: &str) -> anyhow::Result<()> {
        self.messages.lock().unwrap().push((user_id, text.to_string()));
        Ok(())
    }
}

#[derive(Default)]
pub struct StaticFeed {
    pub metrics: Mutex<Option<PairMetrics>>,
}

#[async_trait]
impl MarketDataFeed for StaticFeed {
    async fn best_pair_metrics(&self, _token: Address) -> Option<PairMetrics> {
        self.metrics.lock().unwrap().clone()
    }
}

pub fn routes() -> Vec<RouteConfig> {
    [("a", ROUTER_A), ("b", ROUTER_B)]
        .into_iter()
        .map(|(label, router)| RouteConfig {
            router_label: label.to_string(),
            router,
            base_label: "WETH".to_string(),
            base_pair: WETH,
        })
        .collect()
}

pub fn config() -> Config {
    let mut config = Config::with_routes(routes(), WETH);
    config.stable_token = USDC;
    config.balance_timeout_ms = 100;
    config.quote_timeout_ms = 1_000;
    config
}

pub struct Harness {
    pub chain: Arc<FakeChain>,
    pub feed: Arc<StaticFeed>,
    pub quoter: Arc<RouteQuoter>,
    pub trades: Arc<JsonlTradeLog>,
    pub orders: Arc<JsonOrderStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub processing: Arc<ProcessingSet>,
    pub trader: Arc<Trader>,
    pub ledger: Arc<CostBasisLedger>,
    pub engine: Arc<LimitOrderEngine>,
    pub wallet: WalletRecord,
    pub signer: PrivateKeySigner,
    pub failures: mpsc::UnboundedReceiver<ConfirmationFailure>,
}

/// Fully wired engine over the fake chain. Must be called inside a runtime.
pub async fn harness() -> Harness {
    let config = config();
    let chain = FakeChain::new();
    let chain_dyn: Arc<dyn ChainClient> = chain.clone();
    let feed = Arc::new(StaticFeed::default());

    let quoter = Arc::new(RouteQuoter::new(Arc::clone(&chain_dyn), &config));
    let prices = Arc::new(PriceOracle::new(Arc::clone(&chain_dyn), Arc::clone(&quoter), feed.clone()));
    let trades = Arc::new(JsonlTradeLog::in_memory());
    let orders = Arc::new(JsonOrderStore::in_memory());
    let notifier = Arc::new(RecordingNotifier::default());
    let processing = Arc::new(ProcessingSet::new());

    let keystore = EnvKeyStore::new().with_key(WALLET_ID, USER, ANVIL_KEY).unwrap();
    let wallet = keystore.wallet(WALLET_ID).await.unwrap().unwrap();
    let signer = keystore.signer(&wallet).await.unwrap();
    let keystore: Arc<dyn KeyStore> = Arc::new(keystore);

    let gas = Arc::new(GasEstimator::new(
        Arc::clone(&chain_dyn),
        Arc::new(StaticGasSettings::new(GasSettings::default())),
        config.default_gas_limit,
    ));
    let executor = Arc::new(TradeExecutor::new(
        Arc::clone(&chain_dyn),
        Arc::clone(&quoter),
        Duration::from_secs(config.swap_deadline_secs),
    ));

    let (worker, failures) = ConfirmationWorker::new(
        Arc::clone(&chain_dyn),
        trades.clone(),
        notifier.clone(),
        Arc::clone(&processing),
        config.confirmation_timeout(),
    );
    let (queue, _handle) = worker.spawn();

    let trader = Arc::new(Trader::new(Arc::clone(&keystore), gas, executor, trades.clone(), queue));
    let ledger = Arc::new(CostBasisLedger::new(trades.clone()));
    let engine = Arc::new(LimitOrderEngine::new(
        EngineParts {
            orders: orders.clone(),
            keystore,
            chain: chain_dyn,
            trader: Arc::clone(&trader),
            prices,
            ledger: Arc::clone(&ledger),
            notifier: notifier.clone(),
            processing: Arc::clone(&processing),
        },
        &config,
    ));

    Harness {
        chain,
        feed,
        quoter,
        trades,
        orders,
        notifier,
        processing,
        trader,
        ledger,
        engine,
        wallet,
        signer,
        failures,
    }
}

/// Polls `check` until it holds or two seconds pass.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
