use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

use crate::config::FetchConfig;
use crate::error::WatcherError;
use crate::logging::{ErrorLogger, LogContext, PerformanceMonitor};

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Maximum number of attempts
    pub max_attempts: u32,
    /// Backoff unit; the sleep after attempt N is `base_delay * N`
    pub base_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl From<&FetchConfig> for RetryConfig {
    fn from(config: &FetchConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_delay: config.base_delay(),
        }
    }
}

impl RetryConfig {
    /// Linear backoff for the given 1-based attempt number
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }

    /// Sum of every sleep taken when all attempts fail
    pub fn total_backoff(&self) -> Duration {
        (1..=self.max_attempts)
            .map(|attempt| self.delay_for_attempt(attempt))
            .sum()
    }
}

/// Why a retried operation gave up
#[derive(Debug)]
pub enum RetryError {
    /// Every attempt failed with a retryable error
    Exhausted { attempts: u32, last: WatcherError },
    /// A non-retryable error ended the loop early
    Aborted(WatcherError),
}

/// Retry loop with linear backoff
pub struct RetryManager {
    config: RetryConfig,
    operation_name: String,
}

impl RetryManager {
    pub fn new(operation_name: &str, config: RetryConfig) -> Self {
        Self {
            config,
            operation_name: operation_name.to_string(),
        }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Execute an operation, retrying while `is_retryable` accepts the error.
    ///
    /// Every retryable failure is followed by a sleep, the last one included, so a
    /// fully exhausted run costs `base_delay * (1 + 2 + .. + max_attempts)`.
    pub async fn execute<T, F, Fut, P>(&self, mut operation: F, is_retryable: P) -> Result<T, RetryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, WatcherError>>,
        P: Fn(&WatcherError) -> bool,
    {
        let mut last_error = None;

        for attempt in 1..=self.config.max_attempts {
            let monitor = PerformanceMonitor::new(&format!("{}_attempt_{}", self.operation_name, attempt));
            let result = operation().await;
            monitor.finish_with_result(&result);

            match result {
                Ok(value) => {
                    if attempt > 1 {
                        ErrorLogger::log_recovery_success(&self.operation_name, attempt);
                    }
                    return Ok(value);
                }
                Err(error) => {
                    if !is_retryable(&error) {
                        LogContext::new("retry", &self.operation_name)
                            .with_retry_count(attempt)
                            .with_metadata("reason", serde_json::json!("non_retryable"))
                            .debug(&format!("Non-retryable error, aborting: {}", error));
                        return Err(RetryError::Aborted(error));
                    }

                    ErrorLogger::log_retry_attempt(&self.operation_name, &error, attempt, self.config.max_attempts);

                    let delay = self.config.delay_for_attempt(attempt);
                    LogContext::new("retry", &self.operation_name)
                        .with_retry_count(attempt)
                        .with_metadata("delay_ms", serde_json::json!(delay.as_millis() as u64))
                        .debug(&format!("Sleeping {}ms before next attempt", delay.as_millis()));

                    sleep(delay).await;
                    last_error = Some(error);
                }
            }
        }

        match last_error {
            Some(last) => Err(RetryError::Exhausted {
                attempts: self.config.max_attempts,
                last,
            }),
            // max_attempts == 0: nothing ran
            None => Err(RetryError::Exhausted {
                attempts: 0,
                last: WatcherError::System(crate::error::SystemError::Task(format!(
                    "{} configured with zero attempts",
                    self.operation_name
                ))),
            }),
        }
    }
}
