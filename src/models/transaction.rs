use serde::{Deserialize, Serialize};

use super::{address, Address, Amount};

/// A block with its full, ordered transaction bodies
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub number: u64,
    pub transactions: Vec<Transaction>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub hash: String,
    pub from: Address,
    /// `None` for contract creation
    pub to: Option<Address>,
    /// Native value in the chain's smallest unit
    pub value: u128,
    pub input: Vec<u8>,
}

/// A qualifying transfer to a watched address, as pushed to the event sink.
///
/// The wire record carries no transaction hash or block number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedEvent {
    #[serde(with = "address::checksum")]
    pub to: Address,
    /// Token contract; `None` for native transfers
    #[serde(rename = "contractAddress", with = "address::checksum::option", default)]
    pub contract_address: Option<Address>,
    pub amount: Amount,
    pub network: String,
}

impl DecodedEvent {
    pub fn native(network: &str, to: Address, amount: impl Into<Amount>) -> Self {
        Self {
            to,
            contract_address: None,
            amount: amount.into(),
            network: network.to_string(),
        }
    }

    pub fn token(network: &str, to: Address, contract: Address, amount: impl Into<Amount>) -> Self {
        Self {
            to,
            contract_address: Some(contract),
            amount: amount.into(),
            network: network.to_string(),
        }
    }

    pub fn is_native(&self) -> bool {
        self.contract_address.is_none()
    }
}
