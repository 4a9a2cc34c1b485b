//! Push transport implementations.

use async_trait::async_trait;
use reqwest::Client;

use crate::error::{AppError, Result};
use crate::models::PushMessage;
use crate::storage::PushTransport;

/// Posts each batch as JSON to a push gateway.
pub struct HttpPushTransport {
    client: Client,
    endpoint: String,
}

impl HttpPushTransport {
    pub fn new(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl PushTransport for HttpPushTransport {
    async fn send(&self, message: &PushMessage) -> Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(message)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::transport(format!(
                "push gateway answered {} for {} destination(s)",
                status,
                message.destinations.len()
            )));
        }
        Ok(())
    }
}

/// Logs messages instead of delivering them.
#[derive(Debug, Default)]
pub struct LogTransport;

#[async_trait]
impl PushTransport for LogTransport {
    async fn send(&self, message: &PushMessage) -> Result<()> {
        log::info!(
            "[dry-run] {} -> {} destination(s): {}",
            message.title,
            message.destinations.len(),
            message.body
        );
        Ok(())
    }
}
