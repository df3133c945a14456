use serde_json::json;
use std::sync::Arc;

use super::ChainClient;
use crate::logging::LogContext;
use crate::models::{scale_be_bytes, Address, DecodedEvent, Transaction, WatchlistSnapshot};

/// `transfer(address,uint256)` selector
pub const TRANSFER_SELECTOR: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];

/// Selector plus the recipient word
const RECIPIENT_END: usize = 36;

/// Decoded arguments of an ERC-20 `transfer` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferCall<'a> {
    pub recipient: Address,
    /// Big-endian amount, everything after the recipient word
    pub raw_amount: &'a [u8],
}

/// Decode `transfer(address,uint256)` calldata.
///
/// `None` for any other selector, for input too short to hold the recipient
/// word, and for an empty amount tail.
pub fn decode_transfer_call(input: &[u8]) -> Option<TransferCall<'_>> {
    if input.len() < RECIPIENT_END || input[..4] != TRANSFER_SELECTOR {
        return None;
    }

    let raw_amount = &input[RECIPIENT_END..];
    if raw_amount.is_empty() {
        return None;
    }

    // low 20 bytes of the first argument word
    let recipient = Address::from_slice(&input[16..RECIPIENT_END]);

    Some(TransferCall { recipient, raw_amount })
}

/// Turns transactions into events for watched recipients
pub struct TransactionClassifier {
    client: Arc<dyn ChainClient>,
}

impl TransactionClassifier {
    pub fn new(client: Arc<dyn ChainClient>) -> Self {
        Self { client }
    }

    /// Zero, one or two events for `tx`. The native check always runs first.
    pub async fn classify(&self, tx: &Transaction, block_number: u64, watchlist: &WatchlistSnapshot) -> Vec<DecodedEvent> {
        let mut events = Vec::new();

        if let Some(event) = self.check_native(tx, block_number, watchlist) {
            events.push(event);
        }
        if let Some(event) = self.check_token_transfer(tx, block_number, watchlist).await {
            events.push(event);
        }

        events
    }

    /// Any value sent to a watched `to`, zero included
    pub fn check_native(&self, tx: &Transaction, block_number: u64, watchlist: &WatchlistSnapshot) -> Option<DecodedEvent> {
        let to = tx.to?;
        if !watchlist.contains(&to) {
            return None;
        }

        let amount = self.client.native_amount(tx.value);
        self.log_match(tx, block_number, &to, None, &amount.to_string());
        Some(DecodedEvent::native(self.client.network(), to, amount))
    }

    /// ERC-20 `transfer` to a watched recipient
    pub async fn check_token_transfer(
        &self,
        tx: &Transaction,
        block_number: u64,
        watchlist: &WatchlistSnapshot,
    ) -> Option<DecodedEvent> {
        if tx.input.is_empty() {
            return None;
        }

        let call = decode_transfer_call(&tx.input)?;
        if !watchlist.contains(&call.recipient) {
            return None;
        }

        let contract = match tx.to {
            Some(contract) => contract,
            None => {
                self.match_context(tx, block_number, &call.recipient)
                    .debug("Transfer calldata in a contract creation, ignoring");
                return None;
            }
        };

        let decimals = self.client.token_decimals(&contract).await;
        match scale_be_bytes(call.raw_amount, decimals) {
            Some(amount) => {
                self.log_match(tx, block_number, &call.recipient, Some(&contract), &amount.to_string());
                Some(DecodedEvent::token(self.client.network(), call.recipient, contract, amount))
            }
            // only calldata tails far wider than uint256
            None => {
                self.match_context(tx, block_number, &call.recipient)
                    .with_metadata("contract_address", json!(contract.to_checksum(None)))
                    .error("Token transfer amount overflows f64, dropping");
                None
            }
        }
    }

    fn match_context(&self, tx: &Transaction, block_number: u64, recipient: &Address) -> LogContext {
        LogContext::new("classifier", "classify")
            .with_network(self.client.network())
            .with_block_number(block_number)
            .with_transaction_hash(&tx.hash)
            .with_address(&recipient.to_checksum(None))
    }

    fn log_match(&self, tx: &Transaction, block_number: u64, recipient: &Address, contract: Option<&Address>, amount: &str) {
        let kind = if contract.is_some() { "token" } else { "native" };
        self.match_context(tx, block_number, recipient)
            .with_amount(amount)
            .with_metadata("contract_address", json!(contract.map(|c| c.to_checksum(None))))
            .info(&format!("{} - Detected {} transfer to {}", self.client.network(), kind, recipient.to_checksum(None)));
    }
}
