use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

use crate::config::ServiceConfig;
use crate::error::{DeliveryError, Result};
use crate::logging::{ErrorLogger, LogContext};
use crate::models::WatchlistSnapshot;

/// Where the set of watched addresses comes from
#[async_trait]
pub trait WatchlistSource: Send + Sync {
    async fn fetch(&self) -> Result<WatchlistSnapshot>;

    /// Snapshot for one cycle; any failure yields an empty set
    async fn snapshot(&self, network: &str) -> WatchlistSnapshot {
        match self.fetch().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                ErrorLogger::log_error(&e, Some(LogContext::new("watchlist", "snapshot").with_network(network)));
                WatchlistSnapshot::empty()
            }
        }
    }
}

/// Registry reached over HTTP, `GET` returning a JSON array of strings
pub struct HttpWatchlistSource {
    client: Client,
    url: String,
}

impl HttpWatchlistSource {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(DeliveryError::Http)?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        Self::new(&config.watchlist_url(), Duration::from_secs(config.timeout_seconds))
    }
}

#[async_trait]
impl WatchlistSource for HttpWatchlistSource {
    async fn fetch(&self) -> Result<WatchlistSnapshot> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| DeliveryError::Watchlist(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Status {
                url: self.url.clone(),
                status: status.as_u16(),
            }
            .into());
        }

        let entries: Vec<String> = response
            .json()
            .await
            .map_err(|e| DeliveryError::Watchlist(format!("invalid body: {}", e)))?;
        let snapshot = WatchlistSnapshot::from_entries(&entries);

        LogContext::new("watchlist", "fetch")
            .with_metadata("entries", json!(entries.len()))
            .with_metadata("addresses", json!(snapshot.len()))
            .debug(&format!("Fetched {} watched addresses", snapshot.len()));

        Ok(snapshot)
    }
}
