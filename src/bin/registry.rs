use clap::Parser;
use std::sync::Arc;

use wallet_watcher::api::{RegistryServer, WatchlistRegistry};
use wallet_watcher::config::AppConfig;
use wallet_watcher::logging::init_logging;

#[derive(Parser)]
#[command(name = "registry")]
#[command(about = "HTTP registry of watched wallets")]
#[command(version)]
struct Args {
    /// Bind address
    #[arg(long)]
    host: Option<String>,

    /// Server port
    #[arg(long)]
    port: Option<u16>,

    /// Wallets to seed the registry with
    #[arg(long = "wallet")]
    wallets: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = AppConfig::load()?;
    if let Some(host) = args.host {
        config.registry.host = host;
    }
    if let Some(port) = args.port {
        config.registry.port = port;
    }

    init_logging(&config.logging)?;

    let registry = Arc::new(WatchlistRegistry::with_wallets(args.wallets));
    let server = RegistryServer::new(registry, &config.registry);

    log::info!("Starting watchlist registry on {}:{}", server.host, server.port);

    if let Err(e) = server.start().await {
        log::error!("Server failed: {}", e);
        return Err(e.into());
    }

    Ok(())
}
