pub mod block_fetcher;
pub mod classifier;
pub mod client;
pub mod network_monitor;
pub mod rpc_client;
pub mod supervisor;

pub use block_fetcher::RetryingBlockFetcher;
pub use classifier::{decode_transfer_call, TransactionClassifier, TransferCall, TRANSFER_SELECTOR};
pub use client::{ChainClient, EvmChainClient, DEFAULT_TOKEN_DECIMALS};
pub use network_monitor::{CycleReport, MonitorSettings, NetworkMonitor};
pub use rpc_client::RpcClient;
pub use supervisor::{MonitorExit, MonitorSupervisor};
