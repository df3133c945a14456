use serde_json::json;
use std::sync::Arc;
use tokio::task::JoinSet;

use super::{ChainClient, EvmChainClient, MonitorSettings, NetworkMonitor};
use crate::config::AppConfig;
use crate::error::{ConfigError, Result};
use crate::logging::LogContext;
use crate::services::{EventSink, WatchlistSource};

/// How a monitor task ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorExit {
    pub network: String,
    pub panicked: bool,
}

/// Runs one [`NetworkMonitor`] per network, each in its own task.
/// Exited monitors are not restarted.
pub struct MonitorSupervisor {
    monitors: Vec<NetworkMonitor>,
}

impl MonitorSupervisor {
    pub fn new(monitors: Vec<NetworkMonitor>) -> Result<Self> {
        if monitors.is_empty() {
            return Err(ConfigError::NoNetworks.into());
        }
        Ok(Self { monitors })
    }

    /// One EVM JSON-RPC monitor per configured network
    pub fn from_config(
        config: &AppConfig,
        watchlist: Arc<dyn WatchlistSource>,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self> {
        let settings = MonitorSettings::from_config(config);

        let monitors = config
            .networks
            .iter()
            .map(|network| -> Result<NetworkMonitor> {
                let client: Arc<dyn ChainClient> = Arc::new(EvmChainClient::new(network, &config.rpc)?);
                Ok(NetworkMonitor::new(
                    client,
                    Arc::clone(&watchlist),
                    Arc::clone(&sink),
                    settings.clone(),
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        Self::new(monitors)
    }

    pub fn networks(&self) -> Vec<&str> {
        self.monitors.iter().map(NetworkMonitor::network).collect()
    }

    /// Start every monitor and wait for all of them to exit
    pub async fn run(self) -> Vec<MonitorExit> {
        let mut tasks = JoinSet::new();

        for monitor in self.monitors {
            let network = monitor.network().to_string();
            LogContext::new("supervisor", "start")
                .with_network(&network)
                .info(&format!("Starting monitor for {}", network));

            // inner task isolates panics so the exit can be attributed to its network
            let handle = tokio::spawn(monitor.run());
            tasks.spawn(async move {
                let outcome = handle.await;
                (network, outcome)
            });
        }

        let mut exits = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let exit = match joined {
                Ok((network, Ok(()))) => {
                    LogContext::new("supervisor", "exit")
                        .with_network(&network)
                        .warn(&format!("Monitor for {} exited", network));
                    MonitorExit {
                        network,
                        panicked: false,
                    }
                }
                Ok((network, Err(join_error))) => {
                    LogContext::new("supervisor", "exit")
                        .with_network(&network)
                        .with_metadata("error", json!(join_error.to_string()))
                        .error(&format!("Monitor for {} panicked", network));
                    MonitorExit {
                        network,
                        panicked: join_error.is_panic(),
                    }
                }
                Err(join_error) => {
                    LogContext::new("supervisor", "exit")
                        .with_metadata("error", json!(join_error.to_string()))
                        .error("Supervisor task failed");
                    continue;
                }
            };
            exits.push(exit);
        }

        exits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_monitors_is_config_error() {
        let result = MonitorSupervisor::new(Vec::new());
        assert!(matches!(
            result,
            Err(crate::error::WatcherError::Config(ConfigError::NoNetworks))
        ));
    }
}
