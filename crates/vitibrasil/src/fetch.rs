//! Remote retrieval of upstream pages.
//!
//! One GET per call: no retries, no backoff. Callers that want another
//! attempt ask again.

use std::time::Duration;

use async_trait::async_trait;

use crate::address::ExternalAddress;
use crate::types::{VitiError, VitiResult};

/// Per-request timeout for upstream fetches.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const USER_AGENT: &str = concat!("vitibrasil/", env!("CARGO_PKG_VERSION"));

/// Source of raw page markup for a resolved address.
#[async_trait]
pub trait TableSource: Send + Sync {
    /// Fetch the page at `address`.
    ///
    /// Fails with [`VitiError::UpstreamUnreachable`] on network errors,
    /// timeouts and non-2xx statuses.
    async fn fetch(&self, address: &ExternalAddress) -> VitiResult<String>;
}

/// HTTP implementation of [`TableSource`] over reqwest.
#[derive(Clone)]
pub struct HttpTableSource {
    client: reqwest::Client,
}

impl HttpTableSource {
    pub fn new(timeout: Duration) -> VitiResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| VitiError::UpstreamUnreachable(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TableSource for HttpTableSource {
    async fn fetch(&self, address: &ExternalAddress) -> VitiResult<String> {
        let url = address.as_str();
        let resp = self.client.get(url).send().await.map_err(|e| {
            tracing::warn!(%url, error = %e, "upstream request failed");
            VitiError::UpstreamUnreachable(format!("{url}: {e}"))
        })?;

        let status = resp.status();
        if !status.is_success() {
            tracing::warn!(%url, status = status.as_u16(), "upstream returned error status");
            return Err(VitiError::UpstreamUnreachable(format!(
                "{url}: HTTP {}",
                status.as_u16()
            )));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| VitiError::UpstreamUnreachable(format!("{url}: failed to read body: {e}")))?;

        tracing::debug!(%url, bytes = body.len(), "fetched upstream page");
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_source_creation() {
        assert!(HttpTableSource::new(DEFAULT_TIMEOUT).is_ok());
    }

    #[test]
    fn test_user_agent_names_crate() {
        assert!(USER_AGENT.starts_with("vitibrasil/"));
    }
}
