// 🌐 Feed Source
// Where the raw CSV comes from. One blocking GET, no retries.

use std::time::Duration;

use tracing::{debug, info};

use crate::error::{EtlError, Result};

const USER_AGENT: &str = "Mozilla/5.0 (respiratory-virus-dashboard/1.0)";

/// Anything that can hand back the full text of a feed.
pub trait FeedSource {
    /// Fetch the document at `url`, giving up after `timeout`.
    fn fetch(&self, url: &str, timeout: Duration) -> Result<String>;
}

/// HTTP(S) download via a blocking client.
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpFeedSource;

impl FeedSource for HttpFeedSource {
    fn fetch(&self, url: &str, timeout: Duration) -> Result<String> {
        info!(url, timeout_secs = timeout.as_secs(), "fetching ECDC feed");

        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| EtlError::transport(url, e))?;

        let response = client
            .get(url)
            .send()
            .map_err(|e| EtlError::transport(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EtlError::transport(url, format!("HTTP status {status}")));
        }

        let bytes = response.bytes().map_err(|e| EtlError::transport(url, e))?;
        let text = String::from_utf8(bytes.to_vec())
            .map_err(|e| EtlError::transport(url, format!("body is not UTF-8: {e}")))?;

        debug!(bytes = text.len(), "feed downloaded");
        Ok(text)
    }
}
