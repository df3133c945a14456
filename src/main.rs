use clap::Parser;
use log::{error, info};
use std::sync::Arc;

use wallet_watcher::config::{parse_rpc_nodes, AppConfig};
use wallet_watcher::logging::init_logging;
use wallet_watcher::services::{EventSink, HttpEventSink, HttpWatchlistSource, WatchlistSource};
use wallet_watcher::MonitorSupervisor;

#[derive(Parser)]
#[command(name = "watcher")]
#[command(about = "Watch EVM networks for transfers to registered wallets")]
#[command(version)]
struct Args {
    /// Networks as name=url, comma separated; replaces configured networks
    #[arg(long)]
    nodes: Option<String>,

    /// Watchlist registry / event sink base URL
    #[arg(long)]
    service_url: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long)]
    log_level: Option<String>,

    /// Print a sample configuration file and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if args.print_config {
        println!("{}", AppConfig::generate_sample_config()?);
        return Ok(());
    }

    let mut config = AppConfig::load()?;
    if let Some(nodes) = &args.nodes {
        config.networks = parse_rpc_nodes(nodes)?;
    }
    if let Some(url) = args.service_url {
        config.service.base_url = url;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    config.validate()?;

    init_logging(&config.logging)?;
    info!(
        "Starting wallet watcher for {} network(s), service at {}",
        config.networks.len(),
        config.service.base_url
    );

    let watchlist: Arc<dyn WatchlistSource> = Arc::new(HttpWatchlistSource::from_config(&config.service)?);
    let sink: Arc<dyn EventSink> = Arc::new(HttpEventSink::from_config(&config.service)?);
    let supervisor = MonitorSupervisor::from_config(&config, watchlist, sink)?;

    tokio::select! {
        exits = supervisor.run() => {
            error!("All monitors exited: {:?}", exits);
        }
        result = tokio::signal::ctrl_c() => {
            match result {
                Ok(()) => info!("Received shutdown signal"),
                Err(e) => error!("Unable to listen for shutdown signal: {}", e),
            }
        }
    }

    Ok(())
}
