// src/services/source.rs

//! Calendar feed sources.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::{AppError, Result};
use crate::models::{Event, FeedConfig};
use crate::services::FeedParser;
use crate::utils::http::feed_url;

/// Something that can produce the parsed events of one feed.
///
/// An `Err` means the feed could not be read this time; it is never used
/// for "the feed is empty".
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self, feed_id: &str) -> Result<Vec<Event>>;
}

/// Feed source backed by the upstream HTTP calendar endpoint.
pub struct HttpFeedSource {
    client: Client,
    config: FeedConfig,
    parser: Arc<FeedParser>,
}

impl HttpFeedSource {
    /// Create a new HTTP feed source.
    pub fn new(client: Client, config: FeedConfig, parser: Arc<FeedParser>) -> Self {
        Self {
            client,
            config,
            parser,
        }
    }

    /// Fetch the raw body of one feed.
    pub async fn fetch_raw(&self, feed_id: &str) -> Result<String> {
        let url = feed_url(&self.config, feed_id)?;
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::feed(feed_id, format!("HTTP status {}", status)));
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch(&self, feed_id: &str) -> Result<Vec<Event>> {
        let body = self.fetch_raw(feed_id).await?;
        let events = self.parser.parse(&body);
        log::debug!("Feed {}: {} event(s)", feed_id, events.len());
        Ok(events)
    }
}
