//! # Documentation Crawler Module for RAG
//!
//! This module gathers the raw knowledge the support assistant answers from. It
//! walks a fixed set of documentation sites breadth-first, extracts the primary
//! text of every page, and hands the pages to the processor for chunking and
//! embedding.
//!
//! ## Key Components
//!
//! - `CrawlerConfig`: Seeds, allow-listed domains, per-domain page caps and politeness delay
//! - `Fetcher` / `HttpFetcher`: Single-page retrieval with a bounded timeout
//! - `extract_page`: Title, primary text and outbound links from raw HTML
//! - `Frontier`: FIFO queue, visited set and per-domain counters
//! - `crawl_website`: Runs the whole traversal and returns a `CrawlReport`
//!
//! ## Guarantees
//!
//! - A URL is fetched at most once per run
//! - Only URLs whose network location is allow-listed are queued or fetched
//! - A domain never has more accepted pages than its cap
//! - Fetch failures and short pages are logged and skipped, never retried

mod config;
mod content_extraction;
mod error;
mod fetch;
mod frontier;

pub use config::{CrawlerConfig, CrawlerConfigBuilder};
pub use content_extraction::{PageContent, extract_content, extract_page, resolve_link};
pub use error::CrawlError;
pub use fetch::{Fetcher, HttpFetcher};
pub use frontier::{CrawlReport, Frontier, crawl_website, crawl_with};

use serde::{Deserialize, Serialize};
use url::Url;

/// A fetched page whose extracted text passed the minimum word threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawledPage {
    /// URL of the page
    pub url: String,

    /// Title of the page, or the URL when the page has none
    pub title: String,

    /// Whitespace-normalized primary text of the page
    pub text: String,

    /// Network location the page was fetched from
    pub domain: String,
}

impl CrawledPage {
    /// Number of whitespace-separated words in the page text
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// Network location of a URL: the host, plus the port when one is explicit.
pub fn network_location(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_location() {
        let url = Url::parse("https://docs.example.com/guide").unwrap();
        assert_eq!(network_location(&url).as_deref(), Some("docs.example.com"));

        let url = Url::parse("http://127.0.0.1:8080/a").unwrap();
        assert_eq!(network_location(&url).as_deref(), Some("127.0.0.1:8080"));

        // Default ports are folded away by the URL parser
        let url = Url::parse("https://docs.example.com:443/").unwrap();
        assert_eq!(network_location(&url).as_deref(), Some("docs.example.com"));
    }

    #[test]
    fn test_crawled_page_word_count() {
        let page = CrawledPage {
            url: "https://docs.example.com/".to_string(),
            title: "Docs".to_string(),
            text: "one two\n\nthree".to_string(),
            domain: "docs.example.com".to_string(),
        };
        assert_eq!(page.word_count(), 3);
    }
}
