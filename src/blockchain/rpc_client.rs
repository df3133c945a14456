use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

use crate::error::{ProcessingError, RpcError, WatcherError};
use crate::logging::{LogContext, MetricsLogger, PerformanceMonitor};
use crate::models::{Address, Block, Transaction};

/// `decimals()` selector
pub const DECIMALS_SELECTOR: &str = "0x313ce567";

#[derive(Debug, Serialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    method: String,
    params: Vec<Value>,
    id: u64,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

/// `eth_getBlockByNumber` payload as sent by the node
#[derive(Debug, Deserialize)]
struct RpcBlock {
    number: String,
    #[serde(default)]
    transactions: Vec<RpcTransaction>,
}

#[derive(Debug, Deserialize)]
struct RpcTransaction {
    hash: String,
    from: String,
    to: Option<String>,
    value: String,
    #[serde(alias = "data", default)]
    input: String,
}

impl TryFrom<RpcBlock> for Block {
    type Error = ProcessingError;

    fn try_from(raw: RpcBlock) -> Result<Self, Self::Error> {
        let number = parse_hex_u64(&raw.number).map_err(ProcessingError::BlockParsing)?;
        let transactions = raw
            .transactions
            .into_iter()
            .map(Transaction::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Block { number, transactions })
    }
}

impl TryFrom<RpcTransaction> for Transaction {
    type Error = ProcessingError;

    fn try_from(raw: RpcTransaction) -> Result<Self, Self::Error> {
        let invalid = |field: &str, detail: String| {
            ProcessingError::TransactionParsing(format!("{} {}: {}", raw.hash, field, detail))
        };

        let from = raw.from.parse::<Address>().map_err(|e| invalid("from", e.to_string()))?;
        let to = match raw.to.as_deref() {
            None | Some("") => None,
            Some(to) => Some(to.parse::<Address>().map_err(|e| invalid("to", e.to_string()))?),
        };
        let value = parse_hex_u128(&raw.value).map_err(|e| invalid("value", e))?;
        let input = decode_hex(&raw.input).map_err(|e| invalid("input", e))?;

        Ok(Transaction {
            hash: raw.hash,
            from,
            to,
            value,
            input,
        })
    }
}

/// JSON-RPC transport for one EVM endpoint
#[derive(Clone)]
pub struct RpcClient {
    client: Client,
    endpoint: String,
    timeout_seconds: u64,
}

impl RpcClient {
    pub fn new(endpoint: &str, timeout_seconds: u64) -> Result<Self, WatcherError> {
        let context = LogContext::new("rpc_client", "initialization")
            .with_metadata("endpoint", json!(endpoint))
            .with_metadata("timeout_seconds", json!(timeout_seconds));
        context.info("Initializing RPC client");

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .map_err(RpcError::Http)?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            timeout_seconds,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn make_request(&self, method: &str, params: Vec<Value>) -> Result<Value, WatcherError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params,
            id: 1,
        };

        LogContext::new("rpc_client", "make_request")
            .with_metadata("method", json!(method))
            .with_metadata("endpoint", json!(self.endpoint))
            .trace(&format!("Sending RPC request: {}", method));

        let monitor = PerformanceMonitor::new(&format!("rpc_{}", method));
        let result = self.send(&request).await;
        let duration = monitor.finish_with_result(&result);
        MetricsLogger::log_rpc_call(method, duration, result.is_ok());

        result
    }

    async fn send(&self, request: &JsonRpcRequest) -> Result<Value, WatcherError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RpcError::Timeout {
                        seconds: self.timeout_seconds,
                    }
                } else if e.is_connect() {
                    RpcError::Connection(e.to_string())
                } else {
                    RpcError::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RpcError::Connection(format!(
                "HTTP error: {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            ))
            .into());
        }

        let rpc_response: JsonRpcResponse = response.json().await.map_err(RpcError::Http)?;

        if let Some(error) = rpc_response.error {
            return Err(RpcError::Method {
                code: error.code,
                message: error.message,
            }
            .into());
        }

        // A JSON `null` result deserializes to `None`; callers decide what it means
        Ok(rpc_response.result.unwrap_or(Value::Null))
    }

    pub async fn get_latest_block_number(&self) -> Result<u64, WatcherError> {
        let result = self.make_request("eth_blockNumber", vec![]).await?;

        let hex_string = result
            .as_str()
            .ok_or_else(|| RpcError::InvalidResponse(format!("block number is not a string: {}", result)))?;

        let block_number = parse_hex_u64(hex_string).map_err(RpcError::InvalidResponse)?;

        LogContext::new("rpc_client", "get_latest_block_number")
            .with_block_number(block_number)
            .debug(&format!("Retrieved latest block number: {}", block_number));

        Ok(block_number)
    }

    /// Full block with transaction bodies. A `null` result is `BlockNotFound`.
    pub async fn get_block(&self, block_number: u64) -> Result<Block, WatcherError> {
        let params = vec![json!(format!("0x{:x}", block_number)), json!(true)];

        let result = self.make_request("eth_getBlockByNumber", params).await?;
        if result.is_null() {
            return Err(RpcError::BlockNotFound { block_number }.into());
        }

        let raw: RpcBlock = serde_json::from_value(result).map_err(|e| {
            ProcessingError::BlockParsing(format!("Failed to parse block {}: {}", block_number, e))
        })?;
        let block = Block::try_from(raw)?;

        LogContext::new("rpc_client", "get_block")
            .with_block_number(block_number)
            .with_metadata("transaction_count", json!(block.transactions.len()))
            .debug(&format!(
                "Retrieved block {} with {} transactions",
                block_number,
                block.transactions.len()
            ));

        Ok(block)
    }

    /// `decimals()` of an ERC-20 contract at the latest block
    pub async fn get_token_decimals(&self, contract: &Address) -> Result<u8, WatcherError> {
        let params = vec![
            json!({ "to": contract.to_checksum(None), "data": DECIMALS_SELECTOR }),
            json!("latest"),
        ];

        let result = self.make_request("eth_call", params).await?;
        let hex_string = result
            .as_str()
            .ok_or_else(|| RpcError::InvalidResponse(format!("eth_call result is not a string: {}", result)))?;

        let bytes = decode_hex(hex_string).map_err(RpcError::InvalidResponse)?;
        decode_uint8_word(&bytes).ok_or_else(|| {
            RpcError::InvalidResponse(format!("decimals() returned {} for {}", hex_string, contract)).into()
        })
    }
}

/// First ABI word as a `uint8`, rejecting short or out-of-range returns
fn decode_uint8_word(bytes: &[u8]) -> Option<u8> {
    let word = bytes.get(..32)?;
    if word[..31].iter().any(|b| *b != 0) {
        return None;
    }
    Some(word[31])
}

fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s)
}

fn parse_hex_u64(s: &str) -> Result<u64, String> {
    u64::from_str_radix(strip_hex_prefix(s), 16).map_err(|e| format!("invalid hex quantity '{}': {}", s, e))
}

fn parse_hex_u128(s: &str) -> Result<u128, String> {
    let digits = strip_hex_prefix(s);
    if digits.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(digits, 16).map_err(|e| format!("invalid hex quantity '{}': {}", s, e))
}

fn decode_hex(s: &str) -> Result<Vec<u8>, String> {
    hex::decode(strip_hex_prefix(s)).map_err(|e| format!("invalid hex data: {}", e))
}
