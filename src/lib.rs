pub mod api;
pub mod blockchain;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod retry;
pub mod services;

pub use blockchain::{
    ChainClient, EvmChainClient, MonitorSupervisor, NetworkMonitor, RetryingBlockFetcher, RpcClient,
    TransactionClassifier,
};
pub use config::{AppConfig, FetchConfig, LoggingConfig, MonitorConfig, NetworkConfig, RegistryConfig, RpcConfig, ServiceConfig};
pub use error::{Result, WatcherError};
pub use logging::{ErrorLogger, LogContext, MetricsLogger, PerformanceMonitor};
pub use models::{Address, Block, Cursor, DecodedEvent, Transaction, WatchlistSnapshot};
pub use retry::{RetryConfig, RetryError, RetryManager};
pub use services::{EventSink, HttpEventSink, HttpWatchlistSource, WatchlistSource};
