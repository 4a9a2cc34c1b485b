// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use url::Url;

use crate::error::Result;
use crate::models::FeedConfig;

/// Create a configured asynchronous HTTP client.
///
/// The timeout bounds every request, so one stuck feed cannot stall the
/// rest of its group-set.
pub fn create_async_client(config: &FeedConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Build the request URL for one feed id.
pub fn feed_url(config: &FeedConfig, feed_id: &str) -> Result<Url> {
    let mut url = Url::parse(&config.base_url)?;
    url.query_pairs_mut()
        .append_pair(&config.feed_param, feed_id);
    Ok(url)
}
