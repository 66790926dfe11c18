//! Single-page retrieval for the crawler
//!
//! The frontier only depends on the `Fetcher` trait, so traversal logic can be
//! exercised against an in-memory site graph.

use std::future::Future;

use reqwest::Client as ReqwestClient;
use tracing::{debug, instrument};
use url::Url;

use crate::crawler::config::CrawlerConfig;
use crate::crawler::error::CrawlError;

/// Retrieves the raw markup of one page.
pub trait Fetcher {
    /// Fetch `url` once. Transport errors, timeouts and non-2xx statuses are failures.
    fn fetch(&self, url: &Url) -> impl Future<Output = Result<String, CrawlError>> + Send;
}

/// `Fetcher` backed by a reqwest client with a bounded per-request timeout
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: ReqwestClient,
}

impl HttpFetcher {
    /// Create a fetcher using the timeout and user agent from the crawler config
    pub fn new(config: &CrawlerConfig) -> Result<Self, CrawlError> {
        let client = ReqwestClient::builder()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    #[instrument(skip_all, fields(url = %url), level = "debug")]
    async fn fetch(&self, url: &Url) -> Result<String, CrawlError> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CrawlError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let body = response.text().await?;
        debug!(bytes = body.len(), "fetched page");
        Ok(body)
    }
}
