use log::{debug, error, info, trace, warn};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use crate::config::LoggingConfig;
use crate::error::{ErrorSeverity, SystemError, WatcherError};

/// Structured logging context
pub struct LogContext {
    pub component: String,
    pub operation: String,
    pub metadata: HashMap<String, Value>,
}

impl LogContext {
    pub fn new(component: &str, operation: &str) -> Self {
        Self {
            component: component.to_string(),
            operation: operation.to_string(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }

    pub fn with_network(self, network: &str) -> Self {
        self.with_metadata("network", json!(network))
    }

    pub fn with_block_number(self, block_number: u64) -> Self {
        self.with_metadata("block_number", json!(block_number))
    }

    pub fn with_transaction_hash(self, tx_hash: &str) -> Self {
        self.with_metadata("transaction_hash", json!(tx_hash))
    }

    pub fn with_address(self, address: &str) -> Self {
        self.with_metadata("address", json!(address))
    }

    pub fn with_amount(self, amount: &str) -> Self {
        self.with_metadata("amount", json!(amount))
    }

    pub fn with_duration_ms(self, duration_ms: u64) -> Self {
        self.with_metadata("duration_ms", json!(duration_ms))
    }

    pub fn with_retry_count(self, retry_count: u32) -> Self {
        self.with_metadata("retry_count", json!(retry_count))
    }

    fn format_message(&self, level: &str, message: &str) -> String {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        let mut log_entry = json!({
            "timestamp": timestamp,
            "level": level,
            "component": self.component,
            "operation": self.operation,
            "message": message,
        });

        for (key, value) in &self.metadata {
            log_entry[key] = value.clone();
        }

        log_entry.to_string()
    }

    pub fn info(&self, message: &str) {
        info!("{}", self.format_message("INFO", message));
    }

    pub fn warn(&self, message: &str) {
        warn!("{}", self.format_message("WARN", message));
    }

    pub fn error(&self, message: &str) {
        error!("{}", self.format_message("ERROR", message));
    }

    pub fn debug(&self, message: &str) {
        debug!("{}", self.format_message("DEBUG", message));
    }

    pub fn trace(&self, message: &str) {
        trace!("{}", self.format_message("TRACE", message));
    }
}

/// Times a single operation
pub struct PerformanceMonitor {
    start: Instant,
    operation: String,
    metadata: HashMap<String, Value>,
}

impl PerformanceMonitor {
    pub fn new(operation: &str) -> Self {
        Self {
            start: Instant::now(),
            operation: operation.to_string(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    pub fn finish_with_result<T, E>(self, result: &Result<T, E>) -> u64
    where
        E: std::fmt::Display,
    {
        let duration = self.elapsed_ms();

        let mut context = LogContext::new("performance", &self.operation).with_duration_ms(duration);
        for (key, value) in self.metadata {
            context = context.with_metadata(&key, value);
        }

        match result {
            Ok(_) => context.trace(&format!("Operation completed in {}ms", duration)),
            Err(e) => {
                context = context.with_metadata("error", json!(e.to_string()));
                context.debug(&format!("Operation failed after {}ms: {}", duration, e));
            }
        }

        duration
    }
}

/// Error logging utilities
pub struct ErrorLogger;

impl ErrorLogger {
    pub fn log_error(error: &WatcherError, context: Option<LogContext>) {
        let severity = error.severity();

        let log_context = context
            .unwrap_or_else(|| LogContext::new("error", "unknown"))
            .with_metadata("error_type", json!(format!("{:?}", error)))
            .with_metadata("severity", json!(format!("{:?}", severity)))
            .with_metadata("retryable", json!(error.is_retryable()));

        let message = error.to_string();

        match severity {
            ErrorSeverity::Critical | ErrorSeverity::High => log_context.error(&message),
            ErrorSeverity::Medium => log_context.warn(&message),
            ErrorSeverity::Low => log_context.info(&message),
        }
    }

    pub fn log_retry_attempt(operation: &str, error: &WatcherError, attempt: u32, max_attempts: u32) {
        let context = LogContext::new("retry", operation)
            .with_retry_count(attempt)
            .with_metadata("max_attempts", json!(max_attempts))
            .with_metadata("error", json!(error.to_string()));

        context.warn(&format!("Attempt {}/{} failed: {}", attempt, max_attempts, error));
    }

    pub fn log_recovery_success(operation: &str, attempts: u32) {
        let context = LogContext::new("retry", operation).with_retry_count(attempts);
        context.info(&format!("Operation recovered after {} attempts", attempts));
    }
}

/// Application metrics records
pub struct MetricsLogger;

impl MetricsLogger {
    pub fn log_block_processed(network: &str, block_number: u64, event_count: usize, processing_time_ms: u64) {
        let context = LogContext::new("metrics", "block_processed")
            .with_network(network)
            .with_block_number(block_number)
            .with_metadata("event_count", json!(event_count))
            .with_duration_ms(processing_time_ms);

        context.info(&format!("{} - Block {} processed", network, block_number));
    }

    pub fn log_cycle_completed(network: &str, first_block: u64, last_block: u64, failed_blocks: usize, duration_ms: u64) {
        let context = LogContext::new("metrics", "cycle_completed")
            .with_network(network)
            .with_metadata("first_block", json!(first_block))
            .with_metadata("last_block", json!(last_block))
            .with_metadata("failed_blocks", json!(failed_blocks))
            .with_duration_ms(duration_ms);

        if failed_blocks > 0 {
            context.warn(&format!(
                "{} - Scanned blocks {}..={} with {} skipped",
                network, first_block, last_block, failed_blocks
            ));
        } else {
            context.debug(&format!("{} - Scanned blocks {}..={}", network, first_block, last_block));
        }
    }

    pub fn log_rpc_call(method: &str, duration_ms: u64, success: bool) {
        let context = LogContext::new("metrics", "rpc_call")
            .with_metadata("method", json!(method))
            .with_duration_ms(duration_ms)
            .with_metadata("success", json!(success));

        if success {
            context.trace(&format!("RPC call {} completed in {}ms", method, duration_ms));
        } else {
            context.debug(&format!("RPC call {} failed after {}ms", method, duration_ms));
        }
    }
}

/// Initialize logging for a binary. `RUST_LOG` wins over the configured level.
pub fn init_logging(config: &LoggingConfig) -> Result<(), WatcherError> {
    let json_output = config.format == "json";

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.level.as_str()))
        .format(move |buf, record| {
            use std::io::Write;

            let message = record.args().to_string();
            if json_output {
                if serde_json::from_str::<Value>(&message).is_ok() {
                    return writeln!(buf, "{}", message);
                }
                let entry = json!({
                    "timestamp": chrono::Utc::now().timestamp(),
                    "level": record.level().to_string(),
                    "component": record.target(),
                    "message": message,
                });
                writeln!(buf, "{}", entry)
            } else {
                let rendered = match serde_json::from_str::<Value>(&message) {
                    Ok(Value::Object(fields)) => render_pretty(&fields),
                    _ => message,
                };
                writeln!(
                    buf,
                    "{} [{}] {}: {}",
                    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                    record.level(),
                    record.target(),
                    rendered
                )
            }
        })
        .try_init()
        .map_err(|e| WatcherError::System(SystemError::Logging(e.to_string())))?;

    info!("Logging initialized (level={}, format={})", config.level, config.format);
    Ok(())
}

/// `message key=value ...` for structured entries
fn render_pretty(fields: &serde_json::Map<String, Value>) -> String {
    let message = fields.get("message").and_then(Value::as_str).unwrap_or_default();
    let mut extras: Vec<String> = fields
        .iter()
        .filter(|(key, _)| !matches!(key.as_str(), "message" | "timestamp" | "level"))
        .map(|(key, value)| match value {
            Value::String(s) => format!("{}={}", key, s),
            other => format!("{}={}", key, other),
        })
        .collect();
    extras.sort();

    if extras.is_empty() {
        message.to_string()
    } else {
        format!("{} {}", message, extras.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RpcError;

    #[test]
    fn test_log_context_creation() {
        let context = LogContext::new("test_component", "test_operation");
        assert_eq!(context.component, "test_component");
        assert_eq!(context.operation, "test_operation");
        assert!(context.metadata.is_empty());
    }

    #[test]
    fn test_log_context_with_metadata() {
        let context = LogContext::new("test", "test")
            .with_network("ethereum")
            .with_block_number(12345)
            .with_transaction_hash("0xabc123")
            .with_amount("100.5");

        assert_eq!(context.metadata.get("network"), Some(&json!("ethereum")));
        assert_eq!(context.metadata.get("block_number"), Some(&json!(12345)));
        assert_eq!(context.metadata.get("transaction_hash"), Some(&json!("0xabc123")));
        assert_eq!(context.metadata.get("amount"), Some(&json!("100.5")));
    }

    #[test]
    fn test_log_context_format_message() {
        let context = LogContext::new("test", "test").with_metadata("key", json!("value"));

        let message = context.format_message("INFO", "test message");

        let parsed: Value = serde_json::from_str(&message).expect("Should be valid JSON");
        assert_eq!(parsed["level"], "INFO");
        assert_eq!(parsed["component"], "test");
        assert_eq!(parsed["operation"], "test");
        assert_eq!(parsed["message"], "test message");
        assert_eq!(parsed["key"], "value");
    }

    #[test]
    fn test_performance_monitor_with_result() {
        let monitor = PerformanceMonitor::new("test_operation").with_metadata("method", json!("eth_call"));
        assert_eq!(monitor.metadata.get("method"), Some(&json!("eth_call")));

        let result: Result<(), String> = Err("boom".to_string());
        let duration = monitor.finish_with_result(&result);
        assert!(duration < 1_000);
    }

    #[test]
    fn test_error_logging_does_not_panic() {
        let error = WatcherError::Rpc(RpcError::BlockNotFound { block_number: 7 });
        ErrorLogger::log_error(&error, Some(LogContext::new("test", "error_test")));
        ErrorLogger::log_error(&error, None);
        ErrorLogger::log_retry_attempt("get_block", &error, 1, 5);
        ErrorLogger::log_recovery_success("get_block", 2);
    }

    #[test]
    fn test_metrics_logging_does_not_panic() {
        MetricsLogger::log_block_processed("ethereum", 12345, 2, 150);
        MetricsLogger::log_cycle_completed("ethereum", 10, 12, 1, 300);
        MetricsLogger::log_rpc_call("eth_getBlockByNumber", 250, true);
    }

    #[test]
    fn test_render_pretty() {
        let entry = LogContext::new("monitor", "cycle")
            .with_network("bsc")
            .format_message("INFO", "Scanned");
        let fields = match serde_json::from_str::<Value>(&entry).unwrap() {
            Value::Object(fields) => fields,
            _ => unreachable!(),
        };

        assert_eq!(render_pretty(&fields), "Scanned component=monitor network=bsc operation=cycle");
    }
}
