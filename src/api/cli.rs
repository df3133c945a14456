use clap::{Parser, Subcommand};
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

use super::http::{MessageResponse, WalletsUpdatedResponse};
use crate::models::Address;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Request to registry failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Registry rejected the request: {0}")]
    Rejected(String),
    #[error("Invalid address {0}")]
    InvalidAddress(String),
}

#[derive(Parser, Debug)]
#[command(name = "watchlist-cli")]
#[command(about = "Inspect and extend the wallet watchlist registry")]
#[command(version)]
pub struct Cli {
    /// Registry base URL; defaults to the configured service URL
    #[arg(long)]
    pub url: Option<String>,

    /// Send entries as given instead of validating them as addresses
    #[arg(long)]
    pub raw: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Print every watched wallet
    List,
    /// Append wallets to the watchlist
    Add {
        #[arg(required = true)]
        wallets: Vec<String>,
    },
}

/// Talks to a running registry over HTTP
pub struct CliHandler {
    client: Client,
    base_url: String,
    raw: bool,
}

impl CliHandler {
    pub fn new(base_url: &str, raw: bool) -> Result<Self, CliError> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            raw,
        })
    }

    pub async fn execute_command(&self, command: &Commands) -> Result<(), CliError> {
        match command {
            Commands::List => {
                let wallets = self.list().await?;
                if wallets.is_empty() {
                    println!("No wallets are being watched");
                }
                for wallet in wallets {
                    println!("{}", wallet);
                }
            }
            Commands::Add { wallets } => {
                let all = self.add(wallets).await?;
                println!("Wallets updated successfully ({} watched)", all.len());
            }
        }
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<String>, CliError> {
        let response = self
            .client
            .get(format!("{}/wallets", self.base_url))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    /// Checksums entries unless running in raw mode
    pub async fn add(&self, wallets: &[String]) -> Result<Vec<String>, CliError> {
        let wallets = if self.raw {
            wallets.to_vec()
        } else {
            wallets
                .iter()
                .map(|w| {
                    w.parse::<Address>()
                        .map(|a| a.to_checksum(None))
                        .map_err(|_| CliError::InvalidAddress(w.clone()))
                })
                .collect::<Result<Vec<_>, _>>()?
        };

        let response = self
            .client
            .post(format!("{}/wallets/new", self.base_url))
            .json(&json!({ "wallets": wallets }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let message = match response.json::<MessageResponse>().await {
                Ok(body) => body.message,
                Err(_) => status.to_string(),
            };
            return Err(CliError::Rejected(message));
        }

        let body: WalletsUpdatedResponse = response.json().await?;
        Ok(body.wallets)
    }
}
