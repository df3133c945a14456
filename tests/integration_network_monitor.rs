mod common;

use rust_decimal::Decimal;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use common::{addr, block, native_tx, token_tx, FailingSink, MockChain, RecordingSink, StaticWatchlist, ONE_ETHER, OTHER, TOKEN, WATCHED};
use wallet_watcher::blockchain::{ChainClient, MonitorSettings, NetworkMonitor};
use wallet_watcher::services::{EventSink, WatchlistSource};

struct Harness {
    chain: Arc<MockChain>,
    watchlist: Arc<StaticWatchlist>,
    sink: Arc<RecordingSink>,
    monitor: NetworkMonitor,
}

fn settings(max_concurrent_blocks: usize) -> MonitorSettings {
    MonitorSettings {
        poll_interval: Duration::from_secs(2),
        max_concurrent_blocks,
        ..MonitorSettings::default()
    }
}

fn harness(chain: MockChain, watched: &[&str]) -> Harness {
    harness_with(chain, watched, settings(16))
}

fn harness_with(chain: MockChain, watched: &[&str], settings: MonitorSettings) -> Harness {
    let chain = Arc::new(chain);
    let watchlist = Arc::new(StaticWatchlist::new(watched));
    let sink = Arc::new(RecordingSink::new());

    let client: Arc<dyn ChainClient> = chain.clone();
    let source: Arc<dyn WatchlistSource> = watchlist.clone();
    let events: Arc<dyn EventSink> = sink.clone();
    let monitor = NetworkMonitor::new(client, source, events, settings);

    Harness {
        chain,
        watchlist,
        sink,
        monitor,
    }
}

#[tokio::test(start_paused = true)]
async fn test_initial_cycle_scans_start_block() {
    let mut h = harness(
        MockChain::new("ethereum", 100).with_block(block(100, vec![native_tx("0x1", WATCHED, ONE_ETHER)])),
        &[WATCHED],
    );

    assert_eq!(h.monitor.initialize().await, 100);
    assert_eq!(h.monitor.cursor().map(|c| c.next_block()), Some(100));

    let report = h.monitor.poll_once().await.expect("block 100 is unscanned");
    assert_eq!((report.first_block, report.last_block), (100, 100));
    assert_eq!(report.events_emitted, 1);
    assert_eq!(h.monitor.cursor().map(|c| c.next_block()), Some(101));

    let events = h.sink.wait_for(1, Duration::from_secs(1)).await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].to, addr(WATCHED));
    assert_eq!(events[0].amount, Decimal::ONE);
}

#[tokio::test(start_paused = true)]
async fn test_each_block_scanned_exactly_once() {
    let mut h = harness(MockChain::new("ethereum", 100), &[WATCHED]);
    h.monitor.initialize().await;
    h.monitor.poll_once().await;

    h.chain.set_height(110);
    let report = h.monitor.poll_once().await.unwrap();

    assert_eq!((report.first_block, report.last_block), (101, 110));
    assert_eq!(report.blocks_in_range(), 10);
    assert!(report.failed_blocks.is_empty());

    let counts = h.chain.fetch_counts();
    let expected: Vec<(u64, usize)> = (100..=110).map(|n| (n, 1)).collect();
    assert_eq!(counts, expected);
    assert_eq!(h.monitor.cursor().map(|c| c.next_block()), Some(111));
}

#[tokio::test(start_paused = true)]
async fn test_cursor_advances_past_failed_blocks() {
    let mut h = harness(
        MockChain::new("ethereum", 100)
            .with_not_found(102, u32::MAX)
            .with_failing_block(104),
        &[WATCHED],
    );
    h.monitor.initialize().await;
    h.monitor.poll_once().await;

    h.chain.set_height(105);
    let report = h.monitor.poll_once().await.unwrap();

    assert_eq!(report.failed_blocks, vec![102, 104]);
    assert_eq!(h.monitor.cursor().map(|c| c.next_block()), Some(106));

    // failed blocks are never revisited
    h.chain.set_height(106);
    h.monitor.poll_once().await.unwrap();
    let counts = h.chain.fetch_counts();
    assert_eq!(counts.iter().find(|(n, _)| *n == 102), Some(&(102, 5)));
    assert_eq!(counts.iter().find(|(n, _)| *n == 104), Some(&(104, 1)));
    assert_eq!(counts.last(), Some(&(106, 1)));
}

#[tokio::test(start_paused = true)]
async fn test_no_new_blocks_sleeps_poll_interval() {
    let mut h = harness(MockChain::new("ethereum", 100), &[WATCHED]);
    h.monitor.initialize().await;
    h.monitor.poll_once().await;
    let fetches = h.watchlist.fetches();

    let start = Instant::now();
    assert!(h.monitor.poll_once().await.is_none());
    assert_eq!(start.elapsed(), Duration::from_secs(2));

    // a lagging node never moves the cursor backwards
    h.chain.set_height(90);
    assert!(h.monitor.poll_once().await.is_none());
    assert_eq!(h.monitor.cursor().map(|c| c.next_block()), Some(101));

    // no watchlist fetch while polling
    assert_eq!(h.watchlist.fetches(), fetches);
}

#[tokio::test(start_paused = true)]
async fn test_watchlist_fetched_once_per_cycle() {
    let mut h = harness(MockChain::new("ethereum", 100), &[WATCHED]);
    h.monitor.initialize().await;

    h.chain.set_height(120);
    h.monitor.poll_once().await.unwrap();
    assert_eq!(h.watchlist.fetches(), 1);

    h.chain.set_height(121);
    h.monitor.poll_once().await.unwrap();
    assert_eq!(h.watchlist.fetches(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_watchlist_change_applies_to_next_cycle() {
    let mut h = harness(
        MockChain::new("ethereum", 100)
            .with_block(block(100, vec![native_tx("0x1", OTHER, ONE_ETHER)]))
            .with_block(block(101, vec![native_tx("0x2", OTHER, ONE_ETHER)])),
        &[WATCHED],
    );
    h.monitor.initialize().await;

    let first = h.monitor.poll_once().await.unwrap();
    assert_eq!(first.events_emitted, 0);

    h.watchlist.set(&[WATCHED, OTHER]);
    h.chain.set_height(101);
    let second = h.monitor.poll_once().await.unwrap();
    assert_eq!(second.events_emitted, 1);

    let events = h.sink.wait_for(1, Duration::from_secs(1)).await;
    assert_eq!(events[0].to, addr(OTHER));
}

#[tokio::test(start_paused = true)]
async fn test_watchlist_change_mid_cycle_waits_for_next_cycle() {
    let mut h = harness(
        MockChain::new("ethereum", 100)
            .with_not_found(101, 1)
            .with_block(block(101, vec![native_tx("0x1", WATCHED, ONE_ETHER)]))
            .with_not_found(102, 2)
            .with_block(block(102, vec![native_tx("0x2", OTHER, ONE_ETHER)]))
            .with_block(block(103, vec![native_tx("0x3", OTHER, ONE_ETHER)])),
        &[WATCHED],
    );
    h.monitor.initialize().await;
    h.monitor.poll_once().await;

    // swap the registry while both block tasks sit in retry backoff
    let watchlist = h.watchlist.clone();
    let setter = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        watchlist.set(&[OTHER]);
        Instant::now()
    });

    h.chain.set_height(102);
    let start = Instant::now();
    let report = h.monitor.poll_once().await.unwrap();
    let swapped_at = setter.await.unwrap();

    assert!(swapped_at < start + Duration::from_secs(1));
    assert!(start.elapsed() >= Duration::from_secs(1));
    assert!(report.failed_blocks.is_empty());
    assert_eq!(report.events_emitted, 1);

    let events = h.sink.wait_for(1, Duration::from_secs(1)).await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].to, addr(WATCHED));

    h.chain.set_height(103);
    let next = h.monitor.poll_once().await.unwrap();
    assert_eq!(next.events_emitted, 1);

    let events = h.sink.wait_for(2, Duration::from_secs(1)).await;
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].to, addr(OTHER));
}

#[tokio::test(start_paused = true)]
async fn test_watchlist_failure_means_empty_set() {
    let mut h = harness(
        MockChain::new("ethereum", 100).with_block(block(100, vec![native_tx("0x1", WATCHED, ONE_ETHER)])),
        &[WATCHED],
    );
    h.watchlist.set_failing(true);
    h.monitor.initialize().await;

    let report = h.monitor.poll_once().await.unwrap();

    assert_eq!(report.events_emitted, 0);
    assert_eq!(h.monitor.cursor().map(|c| c.next_block()), Some(101));
    assert!(h.sink.wait_for(1, Duration::from_millis(100)).await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_concurrency_is_bounded() {
    let mut chain = MockChain::new("ethereum", 100);
    for number in 101..=106 {
        chain = chain.with_not_found(number, 1);
    }
    let mut h = harness_with(chain, &[WATCHED], settings(2));
    h.monitor.initialize().await;
    h.monitor.poll_once().await;

    h.chain.set_height(106);
    let start = Instant::now();
    let report = h.monitor.poll_once().await.unwrap();

    // six blocks each waiting one second, two at a time
    assert!(report.failed_blocks.is_empty());
    assert_eq!(start.elapsed(), Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn test_blocks_in_a_cycle_run_in_parallel() {
    let mut chain = MockChain::new("ethereum", 100);
    for number in 101..=106 {
        chain = chain.with_not_found(number, 1);
    }
    let mut h = harness(chain, &[WATCHED]);
    h.monitor.initialize().await;
    h.monitor.poll_once().await;

    h.chain.set_height(106);
    let start = Instant::now();
    h.monitor.poll_once().await.unwrap();

    assert_eq!(start.elapsed(), Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn test_height_failures_are_retried() {
    let mut h = harness(MockChain::new("ethereum", 100).with_height_failures(2), &[WATCHED]);
    let start = Instant::now();

    assert_eq!(h.monitor.initialize().await, 100);
    assert_eq!(start.elapsed(), Duration::from_secs(4));
}

#[tokio::test(start_paused = true)]
async fn test_sink_failures_do_not_stall_the_cursor() {
    let chain = Arc::new(
        MockChain::new("ethereum", 100)
            .with_decimals(TOKEN, Some(18))
            .with_block(block(100, vec![token_tx("0x1", TOKEN, WATCHED, ONE_ETHER)])),
    );
    let sink = Arc::new(FailingSink::default());

    let client: Arc<dyn ChainClient> = chain.clone();
    let source: Arc<dyn WatchlistSource> = Arc::new(StaticWatchlist::new(&[WATCHED]));
    let events: Arc<dyn EventSink> = sink.clone();
    let mut monitor = NetworkMonitor::new(client, source, events, settings(4));

    monitor.initialize().await;
    let report = monitor.poll_once().await.unwrap();

    assert_eq!(report.events_emitted, 1);
    assert_eq!(monitor.cursor().map(|c| c.next_block()), Some(101));

    // the push runs detached; give it a turn
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(sink.attempts.load(Ordering::SeqCst), 1);
}
