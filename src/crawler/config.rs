//! # Crawler Configuration Module
//!
//! This module provides configuration options for the documentation crawler:
//! which sites to start from, which network locations may be visited, how many
//! pages each of them may contribute, and how politely to fetch. It uses a
//! builder pattern for flexible configuration.
//!
//! ## Key Components
//!
//! - `CrawlerConfig`: The main configuration struct with crawler parameters
//! - `CrawlerConfigBuilder`: Builder pattern implementation with validation
//!
//! When no allow-list is given, the builder allows exactly the network
//! locations of the seed URLs.

use std::time::Duration;

use url::Url;

use crate::crawler::error::CrawlError;
use crate::crawler::network_location;

/// Configuration for the crawler
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    /// URLs the breadth-first traversal starts from
    pub seed_urls: Vec<String>,

    /// Network locations (host, or host:port) that may be queued or fetched
    pub allowed_domains: Vec<String>,

    /// Maximum number of accepted pages per network location
    pub max_pages_per_domain: usize,

    /// Delay in milliseconds between consecutive requests
    pub request_delay_ms: u64,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,

    /// Pages must have strictly more words than this to be accepted
    pub min_words: usize,

    /// User agent to use for requests
    pub user_agent: String,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            seed_urls: Vec::new(),
            allowed_domains: Vec::new(),
            max_pages_per_domain: 200,
            request_delay_ms: 500,
            request_timeout_secs: 12,
            min_words: 50,
            user_agent: format!("supportdesk-ingest/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Builder for CrawlerConfig
#[derive(Debug, Default)]
pub struct CrawlerConfigBuilder {
    config: CrawlerConfig,
}

impl CrawlerConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: CrawlerConfig::default(),
        }
    }

    /// Add a seed URL
    pub fn seed_url(mut self, url: impl Into<String>) -> Self {
        self.config.seed_urls.push(url.into());
        self
    }

    /// Replace the seed URLs
    pub fn seed_urls(mut self, urls: Vec<String>) -> Self {
        self.config.seed_urls = urls;
        self
    }

    /// Replace the allow-listed network locations
    pub fn allowed_domains(mut self, domains: Vec<String>) -> Self {
        self.config.allowed_domains = domains;
        self
    }

    /// Set the per-domain page cap
    pub fn max_pages_per_domain(mut self, max_pages: usize) -> Self {
        self.config.max_pages_per_domain = max_pages;
        self
    }

    /// Set the delay in milliseconds between requests
    pub fn request_delay_ms(mut self, delay_ms: u64) -> Self {
        self.config.request_delay_ms = delay_ms;
        self
    }

    /// Set the per-request timeout in seconds
    pub fn request_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.config.request_timeout_secs = timeout_secs;
        self
    }

    /// Set the minimum word threshold
    pub fn min_words(mut self, min_words: usize) -> Self {
        self.config.min_words = min_words;
        self
    }

    /// Set the user agent to use for requests
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Validate and build the configuration
    pub fn build(mut self) -> Result<CrawlerConfig, CrawlError> {
        if self.config.seed_urls.is_empty() {
            return Err(CrawlError::InvalidConfig(
                "at least one seed URL is required".to_string(),
            ));
        }

        let mut seed_domains = Vec::new();
        for seed in &self.config.seed_urls {
            let parsed = Url::parse(seed)?;
            let domain = network_location(&parsed).ok_or_else(|| {
                CrawlError::InvalidConfig(format!("seed URL has no host: {seed}"))
            })?;
            if !seed_domains.contains(&domain) {
                seed_domains.push(domain);
            }
        }

        if self.config.allowed_domains.is_empty() {
            self.config.allowed_domains = seed_domains;
        } else {
            let mut allowed = Vec::new();
            for entry in &self.config.allowed_domains {
                let domain = normalize_domain(entry)?;
                if !allowed.contains(&domain) {
                    allowed.push(domain);
                }
            }
            self.config.allowed_domains = allowed;
        }
        if self.config.request_timeout_secs == 0 {
            return Err(CrawlError::InvalidConfig(
                "request timeout must be at least one second".to_string(),
            ));
        }

        Ok(self.config)
    }
}

/// Bring an allow-list entry into the form `network_location` produces:
/// lowercase host, default ports dropped. A scheme prefix is accepted.
fn normalize_domain(entry: &str) -> Result<String, CrawlError> {
    let entry = entry.trim();
    let candidate = if entry.contains("://") {
        entry.to_string()
    } else {
        format!("http://{entry}")
    };
    let invalid = || CrawlError::InvalidConfig(format!("invalid allowed domain: '{entry}'"));

    let parsed = Url::parse(&candidate).map_err(|_| invalid())?;
    if parsed.path() != "/" || parsed.query().is_some() || !parsed.username().is_empty() {
        return Err(invalid());
    }
    let host = parsed.host_str().filter(|host| !host.is_empty()).ok_or_else(invalid)?;
    Ok(match parsed.port() {
        Some(443) | None => host.to_string(),
        Some(port) => format!("{host}:{port}"),
    })
}

impl CrawlerConfig {
    /// Create a new builder
    pub fn builder() -> CrawlerConfigBuilder {
        CrawlerConfigBuilder::new()
    }

    /// Get the politeness delay as a Duration
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    /// Get the request timeout as a Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
