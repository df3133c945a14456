use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::sleep;

use super::{ChainClient, RetryingBlockFetcher, TransactionClassifier};
use crate::config::AppConfig;
use crate::error::Result;
use crate::logging::{ErrorLogger, LogContext, MetricsLogger, PerformanceMonitor};
use crate::models::{Cursor, WatchlistSnapshot};
use crate::retry::RetryConfig;
use crate::services::{dispatch, EventSink, WatchlistSource};

/// Per-network scheduling knobs
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    /// Sleep when no new block exists or the height query fails
    pub poll_interval: Duration,
    /// Upper bound on block tasks in flight
    pub max_concurrent_blocks: usize,
    pub retry: RetryConfig,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            max_concurrent_blocks: 16,
            retry: RetryConfig::default(),
        }
    }
}

impl MonitorSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            poll_interval: config.monitor.poll_interval(),
            max_concurrent_blocks: config.monitor.max_concurrent_blocks.max(1),
            retry: RetryConfig::from(&config.fetch),
        }
    }
}

/// Outcome of one Scanning pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub first_block: u64,
    pub last_block: u64,
    pub events_emitted: usize,
    /// Blocks given up on; never revisited
    pub failed_blocks: Vec<u64>,
    /// Block tasks that panicked
    pub panicked_tasks: usize,
}

impl CycleReport {
    /// Zero when the cycle ended before its first block
    pub fn blocks_in_range(&self) -> u64 {
        self.last_block.saturating_add(1).saturating_sub(self.first_block)
    }
}

/// Fetch, classify and dispatch for a single block
struct BlockScanner {
    network: String,
    fetcher: RetryingBlockFetcher,
    classifier: TransactionClassifier,
    sink: Arc<dyn EventSink>,
}

impl BlockScanner {
    async fn scan(&self, number: u64, watchlist: &WatchlistSnapshot) -> Result<usize> {
        let monitor = PerformanceMonitor::new("scan_block").with_metadata("block_number", json!(number));

        let block = self.fetcher.fetch(number).await?;

        let mut events = 0;
        for tx in &block.transactions {
            for event in self.classifier.classify(tx, block.number, watchlist).await {
                dispatch(&self.sink, event);
                events += 1;
            }
        }

        let elapsed = monitor.elapsed_ms();
        MetricsLogger::log_block_processed(&self.network, number, events, elapsed);
        Ok(events)
    }
}

/// Drives one network: owns its cursor and loops
/// `Initializing -> Polling <-> Scanning` forever.
pub struct NetworkMonitor {
    network: String,
    client: Arc<dyn ChainClient>,
    scanner: Arc<BlockScanner>,
    watchlist: Arc<dyn WatchlistSource>,
    settings: MonitorSettings,
    cursor: Option<Cursor>,
}

impl NetworkMonitor {
    pub fn new(
        client: Arc<dyn ChainClient>,
        watchlist: Arc<dyn WatchlistSource>,
        sink: Arc<dyn EventSink>,
        settings: MonitorSettings,
    ) -> Self {
        let network = client.network().to_string();
        let scanner = BlockScanner {
            network: network.clone(),
            fetcher: RetryingBlockFetcher::new(Arc::clone(&client), settings.retry.clone()),
            classifier: TransactionClassifier::new(Arc::clone(&client)),
            sink,
        };

        Self {
            network,
            client,
            scanner: Arc::new(scanner),
            watchlist,
            settings,
            cursor: None,
        }
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    pub fn cursor(&self) -> Option<&Cursor> {
        self.cursor.as_ref()
    }

    fn context(&self, operation: &str) -> LogContext {
        LogContext::new("network_monitor", operation).with_network(&self.network)
    }

    /// Set the cursor to the current height, retrying until the node answers
    pub async fn initialize(&mut self) -> u64 {
        loop {
            match self.client.current_height().await {
                Ok(height) => {
                    self.cursor = Some(Cursor::new(&self.network, height));
                    self.context("initialize")
                        .with_block_number(height)
                        .info(&format!("{} - Starting at block {}", self.network, height));
                    return height;
                }
                Err(e) => {
                    ErrorLogger::log_error(&e, Some(self.context("initialize")));
                    sleep(self.settings.poll_interval).await;
                }
            }
        }
    }

    /// One Polling step: scan if the chain moved past the cursor, otherwise sleep
    pub async fn poll_once(&mut self) -> Option<CycleReport> {
        if self.cursor.is_none() {
            self.initialize().await;
        }

        let height = match self.client.current_height().await {
            Ok(height) => height,
            Err(e) => {
                ErrorLogger::log_error(&e, Some(self.context("poll")));
                sleep(self.settings.poll_interval).await;
                return None;
            }
        };

        let behind = self.cursor.as_ref().map_or(false, |cursor| cursor.is_behind(height));
        if !behind {
            self.context("poll")
                .with_block_number(height)
                .trace("No new blocks");
            sleep(self.settings.poll_interval).await;
            return None;
        }

        Some(self.run_cycle(height).await)
    }

    /// Scan `[cursor, height]` against one watchlist snapshot, then move the
    /// cursor past `height` whatever happened to individual blocks.
    pub async fn run_cycle(&mut self, height: u64) -> CycleReport {
        let first_block = match &self.cursor {
            Some(cursor) => cursor.next_block(),
            None => height,
        };
        let mut report = CycleReport {
            first_block,
            last_block: height,
            ..CycleReport::default()
        };
        if first_block > height {
            return report;
        }

        let monitor = PerformanceMonitor::new("scan_cycle");
        let watchlist = self.watchlist.snapshot(&self.network).await;
        self.context("scan")
            .with_metadata("first_block", json!(first_block))
            .with_metadata("last_block", json!(height))
            .with_metadata("watched_addresses", json!(watchlist.len()))
            .debug(&format!("{} - Scanning blocks {}..={}", self.network, first_block, height));

        let semaphore = Arc::new(Semaphore::new(self.settings.max_concurrent_blocks));
        let mut tasks = JoinSet::new();

        for number in first_block..=height {
            let permit = match Arc::clone(&semaphore).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };
            let scanner = Arc::clone(&self.scanner);
            let watchlist = watchlist.clone();

            tasks.spawn(async move {
                let _permit = permit;
                (number, scanner.scan(number, &watchlist).await)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(events))) => report.events_emitted += events,
                Ok((number, Err(e))) => {
                    ErrorLogger::log_error(&e, Some(self.context("scan_block").with_block_number(number)));
                    report.failed_blocks.push(number);
                }
                Err(join_error) => {
                    self.context("scan_block")
                        .with_metadata("error", json!(join_error.to_string()))
                        .error("Block task panicked");
                    report.panicked_tasks += 1;
                }
            }
        }
        report.failed_blocks.sort_unstable();

        if let Some(cursor) = self.cursor.as_mut() {
            cursor.advance_past(height);
        } else {
            self.cursor = Some(Cursor::new(&self.network, height.saturating_add(1)));
        }

        MetricsLogger::log_cycle_completed(
            &self.network,
            first_block,
            height,
            report.failed_blocks.len() + report.panicked_tasks,
            monitor.elapsed_ms(),
        );
        report
    }

    /// Run until the task is dropped
    pub async fn run(mut self) {
        self.initialize().await;
        loop {
            self.poll_once().await;
        }
    }
}
