use std::sync::Arc;

use super::ChainClient;
use crate::error::{Result, RpcError};
use crate::logging::LogContext;
use crate::models::Block;
use crate::retry::{RetryConfig, RetryError, RetryManager};

/// Block fetch with a bounded linear retry on "not found".
/// Any other failure is returned immediately.
pub struct RetryingBlockFetcher {
    client: Arc<dyn ChainClient>,
    retry: RetryManager,
}

impl RetryingBlockFetcher {
    pub fn new(client: Arc<dyn ChainClient>, config: RetryConfig) -> Self {
        let retry = RetryManager::new(&format!("{}_get_block", client.network()), config);
        Self { client, retry }
    }

    pub fn client(&self) -> &Arc<dyn ChainClient> {
        &self.client
    }

    pub async fn fetch(&self, number: u64) -> Result<Block> {
        let result = self
            .retry
            .execute(|| self.client.get_block(number), |e| e.is_retryable())
            .await;

        match result {
            Ok(block) => Ok(block),
            Err(RetryError::Aborted(error)) => Err(error),
            Err(RetryError::Exhausted { attempts, .. }) => {
                LogContext::new("block_fetcher", "fetch")
                    .with_network(self.client.network())
                    .with_block_number(number)
                    .with_retry_count(attempts)
                    .warn(&format!("Block {} not available after {} attempts", number, attempts));

                Err(RpcError::ExhaustedRetries {
                    block_number: number,
                    attempts,
                }
                .into())
            }
        }
    }
}
