#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

use wallet_watcher::blockchain::{ChainClient, TRANSFER_SELECTOR};
use wallet_watcher::error::{DeliveryError, Result, RpcError, WatcherError};
use wallet_watcher::models::{Address, Block, DecodedEvent, Transaction, WatchlistSnapshot};
use wallet_watcher::services::{EventSink, WatchlistSource};

pub const WATCHED: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";
pub const OTHER: &str = "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359";
pub const SENDER: &str = "0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB";
pub const TOKEN: &str = "0xD1220A0cf47c7B9Be7A2E6BA89F429762e7b9aDb";

pub const ONE_ETHER: u128 = 1_000_000_000_000_000_000;

pub fn addr(s: &str) -> Address {
    s.parse().expect("test address")
}

/// ABI-encoded `transfer(recipient, amount)`
pub fn transfer_input(recipient: &str, amount: u128) -> Vec<u8> {
    let mut input = TRANSFER_SELECTOR.to_vec();
    input.extend_from_slice(&[0u8; 12]);
    input.extend_from_slice(addr(recipient).as_slice());
    input.extend_from_slice(&[0u8; 16]);
    input.extend_from_slice(&amount.to_be_bytes());
    input
}

pub fn native_tx(hash: &str, to: &str, value: u128) -> Transaction {
    Transaction {
        hash: hash.to_string(),
        from: addr(SENDER),
        to: Some(addr(to)),
        value,
        input: Vec::new(),
    }
}

pub fn token_tx(hash: &str, contract: &str, recipient: &str, amount: u128) -> Transaction {
    Transaction {
        hash: hash.to_string(),
        from: addr(SENDER),
        to: Some(addr(contract)),
        value: 0,
        input: transfer_input(recipient, amount),
    }
}

pub fn block(number: u64, transactions: Vec<Transaction>) -> Block {
    Block { number, transactions }
}

/// Scriptable in-memory chain
pub struct MockChain {
    network: String,
    native_decimals: u32,
    height: AtomicU64,
    height_failures: AtomicU32,
    panic_on_height: AtomicBool,
    blocks: Mutex<HashMap<u64, Block>>,
    not_found: Mutex<HashMap<u64, u32>>,
    failing_blocks: Mutex<HashSet<u64>>,
    decimals: Mutex<HashMap<Address, Option<u8>>>,
    decimals_calls: AtomicU32,
    fetch_log: Mutex<Vec<(u64, Instant)>>,
}

impl MockChain {
    pub fn new(network: &str, height: u64) -> Self {
        Self {
            network: network.to_string(),
            native_decimals: 18,
            height: AtomicU64::new(height),
            height_failures: AtomicU32::new(0),
            panic_on_height: AtomicBool::new(false),
            blocks: Mutex::new(HashMap::new()),
            not_found: Mutex::new(HashMap::new()),
            failing_blocks: Mutex::new(HashSet::new()),
            decimals: Mutex::new(HashMap::new()),
            decimals_calls: AtomicU32::new(0),
            fetch_log: Mutex::new(Vec::new()),
        }
    }

    pub fn with_native_decimals(mut self, decimals: u32) -> Self {
        self.native_decimals = decimals;
        self
    }

    pub fn with_block(self, block: Block) -> Self {
        self.blocks.lock().unwrap().insert(block.number, block);
        self
    }

    /// `times` NotFound answers before the block is served; `u32::MAX` never serves it
    pub fn with_not_found(self, number: u64, times: u32) -> Self {
        self.not_found.lock().unwrap().insert(number, times);
        self
    }

    pub fn with_failing_block(self, number: u64) -> Self {
        self.failing_blocks.lock().unwrap().insert(number);
        self
    }

    /// `None` makes `decimals()` fail for that contract
    pub fn with_decimals(self, contract: &str, decimals: Option<u8>) -> Self {
        self.decimals.lock().unwrap().insert(addr(contract), decimals);
        self
    }

    pub fn with_height_failures(self, failures: u32) -> Self {
        self.height_failures.store(failures, Ordering::SeqCst);
        self
    }

    pub fn panicking(self) -> Self {
        self.panic_on_height.store(true, Ordering::SeqCst);
        self
    }

    pub fn set_height(&self, height: u64) {
        self.height.store(height, Ordering::SeqCst);
    }

    pub fn fetch_log(&self) -> Vec<(u64, Instant)> {
        self.fetch_log.lock().unwrap().clone()
    }

    /// Distinct block numbers that were requested, sorted, with their request counts
    pub fn fetch_counts(&self) -> Vec<(u64, usize)> {
        let mut counts: HashMap<u64, usize> = HashMap::new();
        for (number, _) in self.fetch_log() {
            *counts.entry(number).or_default() += 1;
        }
        let mut counts: Vec<_> = counts.into_iter().collect();
        counts.sort_unstable();
        counts
    }

    pub fn decimals_calls(&self) -> u32 {
        self.decimals_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainClient for MockChain {
    fn network(&self) -> &str {
        &self.network
    }

    async fn current_height(&self) -> Result<u64> {
        if self.panic_on_height.load(Ordering::SeqCst) {
            panic!("{} node exploded", self.network);
        }
        let remaining = self.height_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.height_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(RpcError::Connection("connection refused".to_string()).into());
        }
        Ok(self.height.load(Ordering::SeqCst))
    }

    async fn get_block(&self, number: u64) -> Result<Block> {
        self.fetch_log.lock().unwrap().push((number, Instant::now()));

        if self.failing_blocks.lock().unwrap().contains(&number) {
            return Err(RpcError::Method {
                code: -32000,
                message: "header not found".to_string(),
            }
            .into());
        }

        {
            let mut not_found = self.not_found.lock().unwrap();
            if let Some(remaining) = not_found.get_mut(&number) {
                if *remaining > 0 {
                    if *remaining != u32::MAX {
                        *remaining -= 1;
                    }
                    return Err(RpcError::BlockNotFound { block_number: number }.into());
                }
            }
        }

        let served = self.blocks.lock().unwrap().get(&number).cloned();
        Ok(served.unwrap_or_else(|| block(number, Vec::new())))
    }

    async fn fetch_token_decimals(&self, contract: &Address) -> Result<u8> {
        self.decimals_calls.fetch_add(1, Ordering::SeqCst);
        match self.decimals.lock().unwrap().get(contract) {
            Some(Some(decimals)) => Ok(*decimals),
            Some(None) => Err(RpcError::Method {
                code: 3,
                message: "execution reverted".to_string(),
            }
            .into()),
            None => Err(RpcError::Timeout { seconds: 30 }.into()),
        }
    }

    fn native_decimals(&self) -> u32 {
        self.native_decimals
    }
}

/// Sink that keeps every pushed event
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<DecodedEvent>>,
    notify: Notify,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DecodedEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Wait until at least `count` events arrived, or give up after `limit`
    pub async fn wait_for(&self, count: usize, limit: Duration) -> Vec<DecodedEvent> {
        let _ = tokio::time::timeout(limit, async {
            loop {
                if self.events.lock().unwrap().len() >= count {
                    return;
                }
                self.notify.notified().await;
            }
        })
        .await;
        self.events()
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn push(&self, event: &DecodedEvent) -> Result<()> {
        self.events.lock().unwrap().push(event.clone());
        self.notify.notify_one();
        Ok(())
    }
}

/// Sink that rejects everything
#[derive(Default)]
pub struct FailingSink {
    pub attempts: AtomicU32,
}

#[async_trait]
impl EventSink for FailingSink {
    async fn push(&self, _event: &DecodedEvent) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(WatcherError::Delivery(DeliveryError::Sink("503 Service Unavailable".to_string())))
    }
}

/// In-memory watchlist that counts fetches
#[derive(Default)]
pub struct StaticWatchlist {
    snapshot: Mutex<WatchlistSnapshot>,
    failing: AtomicBool,
    fetches: AtomicU32,
}

impl StaticWatchlist {
    pub fn new(entries: &[&str]) -> Self {
        let watchlist = Self::default();
        watchlist.set(entries);
        watchlist
    }

    pub fn set(&self, entries: &[&str]) {
        *self.snapshot.lock().unwrap() = WatchlistSnapshot::from_entries(entries.iter().copied());
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn fetches(&self) -> u32 {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WatchlistSource for StaticWatchlist {
    async fn fetch(&self) -> Result<WatchlistSnapshot> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(DeliveryError::Status {
                url: "http://registry/wallets".to_string(),
                status: 500,
            }
            .into());
        }
        Ok(self.snapshot.lock().unwrap().clone())
    }
}
