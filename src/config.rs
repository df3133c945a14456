use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub networks: Vec<NetworkConfig>,
    #[serde(default)]
    pub rpc: RpcConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// One monitored chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Network name used in logs and emitted events
    pub id: String,
    /// JSON-RPC endpoint URL
    pub endpoint: String,
    /// Power of ten between the native smallest unit and its display unit
    #[serde(default = "default_native_decimals")]
    pub native_decimals: u32,
}

fn default_native_decimals() -> u32 {
    18
}

impl NetworkConfig {
    pub fn new(id: &str, endpoint: &str) -> Self {
        Self {
            id: id.to_string(),
            endpoint: endpoint.to_string(),
            native_decimals: default_native_decimals(),
        }
    }
}

/// RPC client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

/// Block fetch retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Attempts before a missing block is given up on
    pub max_attempts: u32,
    /// Backoff unit; attempt N sleeps N times this
    pub base_delay_ms: u64,
}

/// Per-network monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Sleep between height checks when no new block exists
    pub poll_interval_ms: u64,
    /// Upper bound on blocks processed at once per network
    pub max_concurrent_blocks: usize,
}

/// Watchlist registry / event sink service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub base_url: String,
    pub watchlist_path: String,
    pub events_path: String,
    pub timeout_seconds: u64,
}

/// Registry server bind address
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    pub host: String,
    pub port: u16,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self { timeout_seconds: 30 }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 1000,
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2000,
            max_concurrent_blocks: 16,
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8666".to_string(),
            watchlist_path: "/wallets".to_string(),
            events_path: "/".to_string(),
            timeout_seconds: 10,
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8666,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl FetchConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

impl MonitorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl ServiceConfig {
    pub fn watchlist_url(&self) -> String {
        join_url(&self.base_url, &self.watchlist_path)
    }

    pub fn events_url(&self) -> String {
        join_url(&self.base_url, &self.events_path)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

impl AppConfig {
    /// Load configuration from file and environment variables
    /// Environment variables take precedence over file values
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file()?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from TOML file; a missing file yields defaults
    pub fn load_from_file() -> Result<Self, ConfigError> {
        let config_path = env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".to_string());

        if !Path::new(&config_path).exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| ConfigError::FileNotFound(config_path.clone()))?;
        toml::from_str(&content).map_err(|e| ConfigError::Parsing(e.to_string()))
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(nodes) = env::var("RPC_NODES") {
            self.networks = parse_rpc_nodes(&nodes)?;
        }
        if let Ok(timeout) = env::var("RPC_TIMEOUT_SECONDS") {
            self.rpc.timeout_seconds = parse_env("RPC_TIMEOUT_SECONDS", timeout)?;
        }

        if let Ok(attempts) = env::var("BLOCK_FETCH_MAX_ATTEMPTS") {
            self.fetch.max_attempts = parse_env("BLOCK_FETCH_MAX_ATTEMPTS", attempts)?;
        }
        if let Ok(delay) = env::var("BLOCK_FETCH_BASE_DELAY_MS") {
            self.fetch.base_delay_ms = parse_env("BLOCK_FETCH_BASE_DELAY_MS", delay)?;
        }

        if let Ok(interval) = env::var("BLOCK_POLL_INTERVAL_MS") {
            self.monitor.poll_interval_ms = parse_env("BLOCK_POLL_INTERVAL_MS", interval)?;
        }
        if let Ok(limit) = env::var("MAX_CONCURRENT_BLOCKS") {
            self.monitor.max_concurrent_blocks = parse_env("MAX_CONCURRENT_BLOCKS", limit)?;
        }

        if let Ok(url) = env::var("SERVICE_URL") {
            self.service.base_url = url;
        }

        if let Ok(host) = env::var("REGISTRY_HOST") {
            self.registry.host = host;
        }
        if let Ok(port) = env::var("REGISTRY_PORT") {
            self.registry.port = parse_env("REGISTRY_PORT", port)?;
        }

        if let Ok(level) = env::var("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = env::var("LOG_FORMAT") {
            self.logging.format = format;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        for network in &self.networks {
            if network.id.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: "networks.id".to_string(),
                    value: network.id.clone(),
                });
            }
            if !is_http_url(&network.endpoint) {
                return Err(ConfigError::InvalidUrl(network.endpoint.clone()));
            }
            if network.native_decimals > 77 {
                return Err(ConfigError::InvalidValue {
                    key: format!("networks.{}.native_decimals", network.id),
                    value: network.native_decimals.to_string(),
                });
            }
        }

        let mut ids: Vec<&str> = self.networks.iter().map(|n| n.id.as_str()).collect();
        ids.sort_unstable();
        if let Some(pair) = ids.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(ConfigError::InvalidValue {
                key: "networks.id".to_string(),
                value: format!("duplicate network id {}", pair[0]),
            });
        }

        if self.rpc.timeout_seconds == 0 || self.rpc.timeout_seconds > 300 {
            return Err(ConfigError::InvalidValue {
                key: "rpc.timeout_seconds".to_string(),
                value: self.rpc.timeout_seconds.to_string(),
            });
        }

        if self.fetch.max_attempts == 0 || self.fetch.max_attempts > 20 {
            return Err(ConfigError::InvalidValue {
                key: "fetch.max_attempts".to_string(),
                value: self.fetch.max_attempts.to_string(),
            });
        }

        if self.monitor.poll_interval_ms == 0 || self.monitor.poll_interval_ms > 300_000 {
            return Err(ConfigError::InvalidValue {
                key: "monitor.poll_interval_ms".to_string(),
                value: self.monitor.poll_interval_ms.to_string(),
            });
        }

        if self.monitor.max_concurrent_blocks == 0 {
            return Err(ConfigError::InvalidValue {
                key: "monitor.max_concurrent_blocks".to_string(),
                value: self.monitor.max_concurrent_blocks.to_string(),
            });
        }

        if !is_http_url(&self.service.base_url) {
            return Err(ConfigError::InvalidUrl(self.service.base_url.clone()));
        }

        if self.registry.port == 0 {
            return Err(ConfigError::InvalidValue {
                key: "registry.port".to_string(),
                value: self.registry.port.to_string(),
            });
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::InvalidValue {
                key: "logging.level".to_string(),
                value: self.logging.level.clone(),
            });
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(ConfigError::InvalidValue {
                key: "logging.format".to_string(),
                value: self.logging.format.clone(),
            });
        }

        Ok(())
    }

    /// Generate a sample configuration file
    pub fn generate_sample_config() -> Result<String, ConfigError> {
        let mut config = Self::default();
        config.networks = vec![
            NetworkConfig::new("ethereum", "https://eth.llamarpc.com"),
            NetworkConfig::new("bsc", "https://bsc-dataseed.binance.org"),
        ];
        toml::to_string_pretty(&config).map_err(|e| ConfigError::Parsing(e.to_string()))
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value,
    })
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Parse `name=url,name=url` into network configurations
pub fn parse_rpc_nodes(value: &str) -> Result<Vec<NetworkConfig>, ConfigError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (id, endpoint) = entry.split_once('=').ok_or_else(|| ConfigError::InvalidValue {
                key: "RPC_NODES".to_string(),
                value: entry.to_string(),
            })?;
            Ok(NetworkConfig::new(id.trim(), endpoint.trim()))
        })
        .collect()
}
