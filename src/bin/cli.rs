use clap::Parser;

use wallet_watcher::api::{Cli, CliHandler};
use wallet_watcher::config::AppConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // quieter than the long-running binaries
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let url = match cli.url.clone() {
        Some(url) => url,
        None => AppConfig::load().unwrap_or_default().service.base_url,
    };

    let handler = CliHandler::new(&url, cli.raw)?;
    if let Err(e) = handler.execute_command(&cli.command).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
