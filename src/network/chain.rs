//! Chain client seam and its JSON-RPC implementation

use alloy::{
    eips::{BlockId, BlockNumberOrTag, eip2718::Encodable2718},
    network::{EthereumWallet, TransactionBuilder},
    primitives::{Address, B256, Bytes, U256},
    providers::{Provider, ProviderBuilder},
    rpc::types::eth::TransactionRequest,
    signers::local::PrivateKeySigner,
};
use anyhow::Context;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use crate::{
    config::Config,
    errors::{EngineError, EngineResult},
    network::{
        contracts::token_balance,
        retry::{RetryConfig, retry_with_backoff},
    },
    types::FeeData,
    ConcreteProvider,
};

const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonceTag {
    Latest,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub tx_hash: B256,
    pub success: bool,
    pub block_number: Option<u64>,
}

/// Read and write access to one JSON-RPC endpoint.
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn get_balance(&self, address: Address) -> EngineResult<U256>;

    async fn get_fee_data(&self) -> EngineResult<FeeData>;

    /// `eth_call` against `to`. Reverts surface as `Contract` errors.
    async fn call(&self, to: Address, data: Bytes) -> EngineResult<Bytes>;

    async fn get_transaction_count(&self, address: Address, tag: NonceTag) -> EngineResult<u64>;

    /// Signs `tx` with `signer` and broadcasts it, returning once the node accepts it.
    async fn send_transaction(&self, signer: &PrivateKeySigner, tx: TransactionRequest) -> EngineResult<B256>;

    async fn wait_for_confirmation(&self, tx_hash: B256, timeout: Duration) -> EngineResult<Confirmation>;
}

/// Runs a read with an upper bound, mapping expiry to `Timeout`.
pub async fn with_timeout<T, F>(operation: &str, limit: Duration, fut: F) -> EngineResult<T>
where
    F: Future<Output = EngineResult<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(EngineError::Timeout {
            operation: operation.to_string(),
            elapsed: limit,
        }),
    }
}

/// Balance as shown to a user: a slow node degrades to `Unavailable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceView {
    Available(U256),
    Unavailable,
}

/// Native balance when `token` is `None`, otherwise the ERC-20 balance.
pub async fn balance_with_timeout(
    chain: &dyn ChainClient,
    owner: Address,
    token: Option<Address>,
    limit: Duration,
) -> BalanceView {
    let read = async {
        match token {
            Some(token) => token_balance(chain, token, owner).await,
            None => chain.get_balance(owner).await,
        }
    };
    match with_timeout("balance read", limit, read).await {
        Ok(balance) => BalanceView::Available(balance),
        Err(e) => {
            debug!(%owner, error = %e, "Balance unavailable");
            BalanceView::Unavailable
        }
    }
}

pub struct RpcChainClient {
    provider: Arc<ConcreteProvider>,
    chain_id: u64,
    read_retry: RetryConfig,
}

impl RpcChainClient {
    pub fn new(provider: Arc<ConcreteProvider>, chain_id: u64) -> Self {
        Self {
            provider,
            chain_id,
            read_retry: RetryConfig {
                max_attempts: 3,
                initial_delay_ms: 200,
                ..Default::default()
            },
        }
    }

    pub async fn connect(config: &Config) -> anyhow::Result<Self> {
        let provider: Arc<ConcreteProvider> = Arc::new(
            ProviderBuilder::new()
                .on_http(config.rpc_url.parse().context("Invalid RPC_URL")?)
                .boxed()
        );

        info!("🔗 Testing connection to {}...", config.rpc_url);
        let chain_id = retry_with_backoff(
            || async {
                provider.get_chain_id().await.map_err(|e| network_error("get chain id", e))
            },
            &RetryConfig {
                max_attempts: 5,
                initial_delay_ms: 500,
                max_delay_ms: 10000,
                exponential_base: 2.0,
            },
            "RPC connection",
        ).await?;

        if chain_id != config.chain_id {
            warn!("⚠️ Node reports chain {} but CHAIN_ID is {}", chain_id, config.chain_id);
        }
        info!("✅ Connected to chain {}", chain_id);

        Ok(Self::new(provider, config.chain_id))
    }
}

fn network_error(context: &str, e: impl std::fmt::Display) -> EngineError {
    EngineError::Network {
        message: format!("{}: {}", context, e),
        source: None,
        retry_count: 0,
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn get_balance(&self, address: Address) -> EngineResult<U256> {
        retry_with_backoff(
            || async {
                self.provider.get_balance(address).await
                    .map_err(|e| network_error("get balance", e))
            },
            &self.read_retry,
            "native balance",
        ).await
    }

    async fn get_fee_data(&self) -> EngineResult<FeeData> {
        let estimate = retry_with_backoff(
            || async {
                self.provider.estimate_eip1559_fees(None).await
                    .map_err(|e| network_error("fee data", e))
            },
            &self.read_retry,
            "fee data",
        ).await?;

        Ok(FeeData {
            max_fee_per_gas: estimate.max_fee_per_gas,
            max_priority_fee_per_gas: estimate.max_priority_fee_per_gas,
        })
    }

    async fn call(&self, to: Address, data: Bytes) -> EngineResult<Bytes> {
        let tx = TransactionRequest::default().to(to).input(data.into());
        self.provider.call(&tx).await.map_err(|e| EngineError::Contract {
            contract: to,
            message: "eth_call failed".to_string(),
            source: anyhow::anyhow!("{}", e),
        })
    }

    async fn get_transaction_count(&self, address: Address, tag: NonceTag) -> EngineResult<u64> {
        let block = match tag {
            NonceTag::Latest => BlockNumberOrTag::Latest,
            NonceTag::Pending => BlockNumberOrTag::Pending,
        };
        retry_with_backoff(
            || async {
                self.provider
                    .get_transaction_count(address)
                    .block_id(BlockId::Number(block))
                    .await
                    .map_err(|e| network_error("transaction count", e))
            },
            &self.read_retry,
            "transaction count",
        ).await
    }

    async fn send_transaction(&self, signer: &PrivateKeySigner, tx: TransactionRequest) -> EngineResult<B256> {
        let from = signer.address();
        let mut tx = tx.with_from(from).with_chain_id(self.chain_id);
        if tx.nonce.is_none() {
            let nonce = self.get_transaction_count(from, NonceTag::Pending).await?;
            tx.set_nonce(nonce);
        }

        let wallet = EthereumWallet::from(signer.clone());
        let envelope = tx.build(&wallet).await.map_err(|e| EngineError::SubmissionFailed {
            message: "failed to sign transaction".to_string(),
            source: Some(anyhow::anyhow!("{}", e)),
        })?;

        let pending = self.provider
            .send_raw_transaction(&envelope.encoded_2718())
            .await
            .map_err(|e| EngineError::SubmissionFailed {
                message: e.to_string(),
                source: None,
            })?;

        let tx_hash = *pending.tx_hash();
        info!(%tx_hash, %from, "📤 Transaction accepted by node");
        Ok(tx_hash)
    }

    async fn wait_for_confirmation(&self, tx_hash: B256, timeout: Duration) -> EngineResult<Confirmation> {
        let started = Instant::now();
        loop {
            match self.provider.get_transaction_receipt(tx_hash).await {
                Ok(Some(receipt)) => {
                    return Ok(Confirmation {
                        tx_hash,
                        success: receipt.status(),
                        block_number: receipt.block_number,
                    });
                }
                Ok(None) => {}
                Err(e) => debug!(%tx_hash, error = %e, "Receipt poll failed"),
            }

            if started.elapsed() >= timeout {
                return Err(EngineError::Timeout {
                    operation: format!("confirmation of {}", tx_hash),
                    elapsed: started.elapsed(),
                });
            }
            tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
        }
    }
}
