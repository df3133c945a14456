use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::RpcClient;
use crate::config::{NetworkConfig, RpcConfig};
use crate::error::Result;
use crate::logging::LogContext;
use crate::models::{scale_u128, Address, Amount, Block};

/// Precision assumed when a token's `decimals()` cannot be read
pub const DEFAULT_TOKEN_DECIMALS: u32 = 18;

/// Chain access used by the scanning engine
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Network id used in logs and emitted events
    fn network(&self) -> &str;

    async fn current_height(&self) -> Result<u64>;

    /// Block with full transaction bodies; `BlockNotFound` when not yet indexed
    async fn get_block(&self, number: u64) -> Result<Block>;

    /// Raw `decimals()` lookup; failures propagate
    async fn fetch_token_decimals(&self, contract: &Address) -> Result<u8>;

    fn native_decimals(&self) -> u32 {
        18
    }

    /// Native value in smallest units, scaled by `10^native_decimals`
    fn native_amount(&self, units: u128) -> Amount {
        scale_u128(units, self.native_decimals())
    }

    /// Token precision, falling back to 18 on any lookup failure
    async fn token_decimals(&self, contract: &Address) -> u32 {
        match self.fetch_token_decimals(contract).await {
            Ok(decimals) => u32::from(decimals),
            Err(e) => {
                LogContext::new("chain_client", "token_decimals")
                    .with_network(self.network())
                    .with_address(&contract.to_checksum(None))
                    .with_metadata("error", json!(e.to_string()))
                    .warn(&format!(
                        "decimals() lookup failed for {}, assuming {}",
                        contract, DEFAULT_TOKEN_DECIMALS
                    ));
                DEFAULT_TOKEN_DECIMALS
            }
        }
    }
}

/// [`ChainClient`] over an EVM JSON-RPC endpoint
pub struct EvmChainClient {
    network: String,
    native_decimals: u32,
    rpc: RpcClient,
    decimals_cache: RwLock<HashMap<Address, u8>>,
}

impl EvmChainClient {
    pub fn new(network: &NetworkConfig, rpc_config: &RpcConfig) -> Result<Self> {
        let rpc = RpcClient::new(&network.endpoint, rpc_config.timeout_seconds)?;
        Ok(Self::with_rpc(&network.id, network.native_decimals, rpc))
    }

    pub fn with_rpc(network: &str, native_decimals: u32, rpc: RpcClient) -> Self {
        Self {
            network: network.to_string(),
            native_decimals,
            rpc,
            decimals_cache: RwLock::new(HashMap::new()),
        }
    }

    pub async fn cached_decimals(&self) -> usize {
        self.decimals_cache.read().await.len()
    }
}

#[async_trait]
impl ChainClient for EvmChainClient {
    fn network(&self) -> &str {
        &self.network
    }

    async fn current_height(&self) -> Result<u64> {
        self.rpc.get_latest_block_number().await
    }

    async fn get_block(&self, number: u64) -> Result<Block> {
        self.rpc.get_block(number).await
    }

    async fn fetch_token_decimals(&self, contract: &Address) -> Result<u8> {
        if let Some(decimals) = self.decimals_cache.read().await.get(contract) {
            return Ok(*decimals);
        }

        // only successes are cached
        let decimals = self.rpc.get_token_decimals(contract).await?;
        self.decimals_cache.write().await.insert(*contract, decimals);
        Ok(decimals)
    }

    fn native_decimals(&self) -> u32 {
        self.native_decimals
    }
}
