//! Breadth-first crawl frontier
//!
//! The frontier is an explicit FIFO queue of URLs plus a visited set and a map
//! of accepted pages per network location. The queue may transiently hold
//! duplicates; the visited check at dequeue time is the only dedup.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::crawler::config::CrawlerConfig;
use crate::crawler::content_extraction::extract_page;
use crate::crawler::error::CrawlError;
use crate::crawler::fetch::{Fetcher, HttpFetcher};
use crate::crawler::{CrawledPage, network_location};

/// Outcome of one crawl run
#[derive(Debug, Default, Clone)]
pub struct CrawlReport {
    /// Accepted pages, in the order they were fetched
    pub pages: Vec<CrawledPage>,

    /// Number of URLs fetched (successfully or not)
    pub visited: usize,

    /// URLs whose fetch or parse failed
    pub failed: Vec<String>,

    /// URLs fetched successfully but dropped for having too few words
    pub skipped_short: Vec<String>,
}

impl CrawlReport {
    /// Look up an accepted page by URL
    pub fn page(&self, url: &str) -> Option<&CrawledPage> {
        self.pages.iter().find(|page| page.url == url)
    }
}

/// Crawl state for one run
#[derive(Debug)]
pub struct Frontier {
    queue: VecDeque<Url>,
    visited: HashSet<String>,
    accepted: HashMap<String, usize>,
    allowed: HashSet<String>,
    max_pages_per_domain: usize,
}

impl Frontier {
    /// Seed a frontier from the crawler configuration
    pub fn new(config: &CrawlerConfig) -> Result<Self, CrawlError> {
        let queue = config
            .seed_urls
            .iter()
            .map(|seed| {
                // Harvested links carry no fragment either, so both share visited keys
                let mut url = Url::parse(seed)?;
                url.set_fragment(None);
                Ok(url)
            })
            .collect::<Result<VecDeque<_>, CrawlError>>()?;

        Ok(Self {
            queue,
            visited: HashSet::new(),
            accepted: HashMap::new(),
            allowed: config.allowed_domains.iter().cloned().collect(),
            max_pages_per_domain: config.max_pages_per_domain,
        })
    }

    fn is_capped(&self, domain: &str) -> bool {
        self.accepted.get(domain).copied().unwrap_or(0) >= self.max_pages_per_domain
    }

    fn all_domains_capped(&self) -> bool {
        self.allowed.iter().all(|domain| self.is_capped(domain))
    }

    /// Dequeue the next URL worth fetching, with its network location.
    ///
    /// Visited URLs are skipped first, then URLs outside the allow-list (before
    /// any counter is touched), then URLs whose domain reached its cap. Once
    /// every allowed domain is capped the queue is drained.
    pub fn next_url(&mut self) -> Option<(Url, String)> {
        while let Some(url) = self.queue.pop_front() {
            if self.all_domains_capped() {
                debug!(dropped = self.queue.len() + 1, "every domain reached its cap");
                self.queue.clear();
                return None;
            }
            if self.visited.contains(url.as_str()) {
                continue;
            }
            let Some(domain) = network_location(&url) else {
                continue;
            };
            if !self.allowed.contains(&domain) {
                debug!(%url, "skipping URL outside the allow-list");
                continue;
            }
            if self.is_capped(&domain) {
                continue;
            }
            return Some((url, domain));
        }
        None
    }

    /// Record that `url` was fetched. Returns false if it already was.
    pub fn mark_visited(&mut self, url: &Url) -> bool {
        self.visited.insert(url.to_string())
    }

    pub fn is_visited(&self, url: &Url) -> bool {
        self.visited.contains(url.as_str())
    }

    /// Count an accepted page against its domain; returns the new count
    pub fn record_accepted(&mut self, domain: &str) -> usize {
        let count = self.accepted.entry(domain.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    pub fn accepted_count(&self, domain: &str) -> usize {
        self.accepted.get(domain).copied().unwrap_or(0)
    }

    /// Queue every allowed, not yet visited link
    pub fn enqueue_links(&mut self, links: impl IntoIterator<Item = Url>) -> usize {
        let mut queued = 0;
        for link in links {
            let allowed = network_location(&link).is_some_and(|domain| self.allowed.contains(&domain));
            if allowed && !self.is_visited(&link) {
                self.queue.push_back(link);
                queued += 1;
            }
        }
        queued
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

/// Run a breadth-first crawl with the given fetcher.
///
/// Fetches are sequential with the configured delay between them. Fetch and
/// parse failures are logged and skipped; they never abort the run.
#[instrument(skip_all, fields(seeds = config.seed_urls.len()))]
pub async fn crawl_with<F>(fetcher: &F, config: &CrawlerConfig) -> Result<CrawlReport, CrawlError>
where
    F: Fetcher + Sync,
{
    let mut frontier = Frontier::new(config)?;
    let mut report = CrawlReport::default();
    let delay = config.request_delay();

    while let Some((url, domain)) = frontier.next_url() {
        if report.visited > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        frontier.mark_visited(&url);
        report.visited += 1;

        let html = match fetcher.fetch(&url).await {
            Ok(html) => html,
            Err(e) => {
                warn!(%url, error = %e, "fetch failed, skipping");
                report.failed.push(url.to_string());
                continue;
            }
        };
        let content = match extract_page(&html, &url) {
            Ok(content) => content,
            Err(e) => {
                warn!(%url, error = %e, "could not parse page, skipping");
                report.failed.push(url.to_string());
                continue;
            }
        };

        let words = content.word_count();
        let links = content.links;
        if words > config.min_words {
            let count = frontier.record_accepted(&domain);
            info!(%url, words, count, %domain, "saved page");
            report.pages.push(CrawledPage {
                url: url.to_string(),
                title: content.title,
                text: content.text,
                domain,
            });
        } else {
            debug!(%url, words, "skipped short page");
            report.skipped_short.push(url.to_string());
        }

        let queued = frontier.enqueue_links(links);
        debug!(queued, pending = frontier.pending(), "harvested links");
    }

    info!(
        pages = report.pages.len(),
        visited = report.visited,
        failed = report.failed.len(),
        "crawl finished"
    );
    Ok(report)
}

/// Crawl the configured sites over HTTP
pub async fn crawl_website(config: &CrawlerConfig) -> Result<CrawlReport, CrawlError> {
    let fetcher = HttpFetcher::new(config)?;
    crawl_with(&fetcher, config).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    /// In-memory site: URL -> markup. Unknown URLs fail with 404.
    struct MockSite {
        pages: HashMap<String, String>,
        log: Mutex<Vec<String>>,
    }

    impl MockSite {
        fn new(pages: &[(&str, String)]) -> Self {
            Self {
                pages: pages
                    .iter()
                    .map(|(url, html)| (url.to_string(), html.clone()))
                    .collect(),
                log: Mutex::new(Vec::new()),
            }
        }

        fn fetched(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }
    }

    impl Fetcher for MockSite {
        async fn fetch(&self, url: &Url) -> Result<String, CrawlError> {
            self.log.lock().unwrap().push(url.to_string());
            self.pages
                .get(url.as_str())
                .cloned()
                .ok_or_else(|| CrawlError::Status {
                    url: url.to_string(),
                    status: 404,
                })
        }
    }

    fn long_page(title: &str, links: &[&str]) -> String {
        let body = "documentation words fill this paragraph ".repeat(15);
        markup(title, &body, links)
    }

    fn short_page(title: &str, links: &[&str]) -> String {
        markup(title, "Just a short landing page here.", links)
    }

    fn markup(title: &str, body: &str, links: &[&str]) -> String {
        let anchors: String = links
            .iter()
            .map(|href| format!("<a href=\"{href}\">link</a>"))
            .collect();
        format!("<html><head><title>{title}</title></head><body><p>{body}</p>{anchors}</body></html>")
    }

    fn config(seeds: &[&str], cap: usize) -> CrawlerConfig {
        CrawlerConfig::builder()
            .seed_urls(seeds.iter().map(|s| s.to_string()).collect())
            .max_pages_per_domain(cap)
            .request_delay_ms(0)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_visits_each_url_once_deterministically() {
        let site = || {
            MockSite::new(&[
                ("https://docs.example.com/", long_page("Home", &["/a", "/b"])),
                (
                    "https://docs.example.com/a",
                    long_page("A", &["/", "/b", "/a#usage", "https://other.example.org/x"]),
                ),
                ("https://docs.example.com/b", long_page("B", &["/a", "mailto:x@y.z"])),
            ])
        };
        let config = config(&["https://docs.example.com/"], 10);

        let first = site();
        let report = crawl_with(&first, &config).await.unwrap();
        let second = site();
        crawl_with(&second, &config).await.unwrap();

        let expected = vec![
            "https://docs.example.com/",
            "https://docs.example.com/a",
            "https://docs.example.com/b",
        ];
        assert_eq!(first.fetched(), expected);
        assert_eq!(second.fetched(), expected);
        assert_eq!(report.visited, 3);
        assert_eq!(report.pages.len(), 3);
        assert_eq!(report.page("https://docs.example.com/a").unwrap().title, "A");
        assert!(report.failed.is_empty());
    }

    #[tokio::test]
    async fn test_cap_stops_crawl() {
        let site = MockSite::new(&[
            ("https://docs.example.com/", long_page("Home", &["/a", "/b"])),
            ("https://docs.example.com/a", long_page("A", &[])),
            ("https://docs.example.com/b", long_page("B", &[])),
        ]);
        let report = crawl_with(&site, &config(&["https://docs.example.com/"], 1))
            .await
            .unwrap();

        assert_eq!(site.fetched(), vec!["https://docs.example.com/"]);
        assert_eq!(report.pages.len(), 1);
        assert_eq!(report.pages[0].url, "https://docs.example.com/");
        assert_eq!(report.pages[0].domain, "docs.example.com");
    }

    #[tokio::test]
    async fn test_seed_fragment_shares_visited_key() {
        let site = MockSite::new(&[(
            "https://docs.example.com/",
            long_page("Home", &["/", "/#setup"]),
        )]);
        let report = crawl_with(&site, &config(&["https://docs.example.com/#intro"], 10))
            .await
            .unwrap();

        assert_eq!(site.fetched(), vec!["https://docs.example.com/"]);
        assert_eq!(report.pages.len(), 1);
        assert_eq!(report.pages[0].url, "https://docs.example.com/");
    }

    #[tokio::test]
    async fn test_mixed_case_allow_list_matches() {
        let site = MockSite::new(&[
            ("https://docs.example.com/", long_page("Home", &["/a"])),
            ("https://docs.example.com/a", long_page("A", &[])),
        ]);
        let config = CrawlerConfig::builder()
            .seed_url("https://docs.example.com/")
            .allowed_domains(vec!["Docs.Example.com".to_string()])
            .request_delay_ms(0)
            .build()
            .unwrap();

        let report = crawl_with(&site, &config).await.unwrap();

        assert_eq!(
            site.fetched(),
            vec!["https://docs.example.com/", "https://docs.example.com/a"]
        );
        assert_eq!(report.pages.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_between_fetches_only() {
        let site = MockSite::new(&[
            ("https://docs.example.com/", long_page("Home", &["/a", "/b"])),
            ("https://docs.example.com/a", long_page("A", &[])),
            ("https://docs.example.com/b", long_page("B", &[])),
        ]);
        let config = CrawlerConfig::builder()
            .seed_url("https://docs.example.com/")
            .request_delay_ms(250)
            .build()
            .unwrap();

        let start = tokio::time::Instant::now();
        let report = crawl_with(&site, &config).await.unwrap();

        assert_eq!(report.visited, 3);
        assert_eq!(start.elapsed(), Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_short_pages_harvest_links_without_counting() {
        let site = MockSite::new(&[
            ("https://docs.example.com/", short_page("Home", &["/a", "/b"])),
            ("https://docs.example.com/a", long_page("A", &[])),
            ("https://docs.example.com/b", long_page("B", &[])),
        ]);
        let report = crawl_with(&site, &config(&["https://docs.example.com/"], 1))
            .await
            .unwrap();

        assert_eq!(
            site.fetched(),
            vec!["https://docs.example.com/", "https://docs.example.com/a"]
        );
        assert_eq!(report.skipped_short, vec!["https://docs.example.com/"]);
        assert_eq!(report.pages.len(), 1);
        assert_eq!(report.pages[0].url, "https://docs.example.com/a");
    }

    #[tokio::test]
    async fn test_failed_fetch_is_skipped_not_retried() {
        let site = MockSite::new(&[
            ("https://docs.example.com/", long_page("Home", &["/missing", "/a"])),
            ("https://docs.example.com/a", long_page("A", &["/missing"])),
        ]);
        let report = crawl_with(&site, &config(&["https://docs.example.com/"], 10))
            .await
            .unwrap();

        let missing = site
            .fetched()
            .iter()
            .filter(|url| url.as_str() == "https://docs.example.com/missing")
            .count();
        assert_eq!(missing, 1);
        assert_eq!(report.failed, vec!["https://docs.example.com/missing"]);
        assert_eq!(report.pages.len(), 2);
        assert_eq!(report.visited, 3);
    }

    #[tokio::test]
    async fn test_per_domain_caps_are_independent() {
        let site = MockSite::new(&[
            ("https://docs.example.com/", long_page("Docs", &["/more"])),
            ("https://docs.example.com/more", long_page("More", &[])),
            ("https://developer.example.com/", long_page("Dev", &["/api"])),
            ("https://developer.example.com/api", long_page("API", &[])),
        ]);
        let report = crawl_with(
            &site,
            &config(&["https://docs.example.com/", "https://developer.example.com/"], 1),
        )
        .await
        .unwrap();

        assert_eq!(
            site.fetched(),
            vec!["https://docs.example.com/", "https://developer.example.com/"]
        );
        assert_eq!(report.pages.len(), 2);
    }

    #[test]
    fn test_disallowed_urls_skipped_before_bookkeeping() {
        let config = CrawlerConfig::builder()
            .seed_urls(vec![
                "https://elsewhere.example.net/".to_string(),
                "https://docs.example.com/".to_string(),
            ])
            .allowed_domains(vec!["docs.example.com".to_string()])
            .build()
            .unwrap();
        let mut frontier = Frontier::new(&config).unwrap();

        let (url, domain) = frontier.next_url().unwrap();
        assert_eq!(url.as_str(), "https://docs.example.com/");
        assert_eq!(domain, "docs.example.com");
        assert_eq!(frontier.accepted_count("elsewhere.example.net"), 0);
        assert!(frontier.accepted.get("elsewhere.example.net").is_none());

        frontier.mark_visited(&url);
        let queued = frontier.enqueue_links(vec![
            url.clone(),
            Url::parse("https://elsewhere.example.net/x").unwrap(),
            Url::parse("https://docs.example.com/y").unwrap(),
            Url::parse("https://docs.example.com/y").unwrap(),
        ]);
        assert_eq!(queued, 2);
        assert_eq!(frontier.next_url().unwrap().0.as_str(), "https://docs.example.com/y");

        // Duplicate is dropped at dequeue time once visited
        frontier.mark_visited(&Url::parse("https://docs.example.com/y").unwrap());
        assert!(frontier.next_url().is_none());
    }

    #[test]
    fn test_zero_cap_fetches_nothing() {
        let mut frontier = Frontier::new(&config(&["https://docs.example.com/"], 0)).unwrap();
        assert!(frontier.next_url().is_none());
        assert_eq!(frontier.pending(), 0);
    }
}
