use thiserror::Error;

/// Main error type for the wallet watcher
#[derive(Error, Debug)]
pub enum WatcherError {
    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),

    #[error("Processing error: {0}")]
    Processing(#[from] ProcessingError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("System error: {0}")]
    System(#[from] SystemError),
}

/// Errors raised at the chain RPC boundary
#[derive(Error, Debug)]
pub enum RpcError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("RPC method error: code={code}, message={message}")]
    Method { code: i32, message: String },

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Timeout after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Block not found: {block_number}")]
    BlockNotFound { block_number: u64 },

    #[error("Block {block_number} still not found after {attempts} attempts")]
    ExhaustedRetries { block_number: u64, attempts: u32 },
}

/// Errors raised while validating or decoding chain data
#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("Block parsing failed: {0}")]
    BlockParsing(String),

    #[error("Transaction parsing failed: {0}")]
    TransactionParsing(String),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Configuration parsing failed: {0}")]
    Parsing(String),

    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),

    #[error("No networks configured")]
    NoNetworks,
}

/// Failures talking to the watchlist registry or the event sink
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("Watchlist fetch failed: {0}")]
    Watchlist(String),

    #[error("Event push failed: {0}")]
    Sink(String),

    #[error("Unexpected HTTP status {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// System-level errors
#[derive(Error, Debug)]
pub enum SystemError {
    #[error("Task failed: {0}")]
    Task(String),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, WatcherError>;

/// Error severity levels for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// The process cannot do useful work
    Critical,
    /// A unit of work was lost (a block or an event)
    High,
    /// Degraded but recovered locally
    Medium,
    /// Expected and informational
    Low,
}

impl WatcherError {
    /// Get the severity level of an error
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            WatcherError::Config(_) => ErrorSeverity::Critical,
            WatcherError::System(SystemError::Logging(_)) => ErrorSeverity::Critical,

            WatcherError::Rpc(RpcError::ExhaustedRetries { .. }) => ErrorSeverity::High,
            WatcherError::Processing(ProcessingError::BlockParsing(_)) => ErrorSeverity::High,
            WatcherError::Delivery(DeliveryError::Sink(_)) => ErrorSeverity::High,
            WatcherError::System(SystemError::Task(_)) => ErrorSeverity::High,

            WatcherError::Rpc(RpcError::Timeout { .. }) => ErrorSeverity::Medium,
            WatcherError::Rpc(RpcError::Connection(_)) => ErrorSeverity::Medium,
            WatcherError::Delivery(_) => ErrorSeverity::Medium,

            WatcherError::Rpc(RpcError::BlockNotFound { .. }) => ErrorSeverity::Low,
            _ => ErrorSeverity::Medium,
        }
    }

    /// Whether the block fetcher may retry after this error.
    /// Only a block the node has not indexed yet qualifies.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WatcherError::Rpc(RpcError::BlockNotFound { .. }))
    }
}
