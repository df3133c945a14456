use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ServiceConfig;
use crate::error::{DeliveryError, Result, WatcherError};
use crate::logging::{ErrorLogger, LogContext};
use crate::models::DecodedEvent;

/// Receives decoded events, one at a time
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn push(&self, event: &DecodedEvent) -> Result<()>;
}

/// Push without waiting. Failures are logged and the event is dropped.
pub fn dispatch(sink: &Arc<dyn EventSink>, event: DecodedEvent) {
    let sink = Arc::clone(sink);
    tokio::spawn(async move {
        if let Err(e) = sink.push(&event).await {
            let context = LogContext::new("event_sink", "push")
                .with_network(&event.network)
                .with_address(&event.to.to_checksum(None))
                .with_amount(&event.amount.to_string());
            ErrorLogger::log_error(&e, Some(context));
        }
    });
}

/// `POST`s each event as a flat JSON record
pub struct HttpEventSink {
    client: Client,
    url: String,
}

impl HttpEventSink {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(DeliveryError::Http)?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        Self::new(&config.events_url(), Duration::from_secs(config.timeout_seconds))
    }
}

#[async_trait]
impl EventSink for HttpEventSink {
    async fn push(&self, event: &DecodedEvent) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(event)
            .send()
            .await
            .map_err(|e| WatcherError::Delivery(DeliveryError::Sink(e.to_string())))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Sink(format!("{} answered {}", self.url, status.as_u16())).into());
        }

        LogContext::new("event_sink", "push")
            .with_network(&event.network)
            .with_address(&event.to.to_checksum(None))
            .debug("Event delivered");
        Ok(())
    }
}
