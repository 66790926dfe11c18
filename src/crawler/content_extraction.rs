//! Content extraction functionality for the crawler module
//!
//! Everything here is synchronous and pure: `scraper::Html` is not `Send`, so
//! documents are parsed and dropped before the crawl loop awaits again.

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::crawler::error::CrawlError;

/// Fragments at or below this many characters are treated as navigation noise
const MIN_FRAGMENT_CHARS: usize = 20;

/// Elements whose text is never visible
const HIDDEN_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

/// What the crawler keeps from one page of markup
#[derive(Debug, Clone, PartialEq)]
pub struct PageContent {
    /// Title element text, or the page URL when there is none
    pub title: String,

    /// Primary text, fragments joined by a blank line
    pub text: String,

    /// Absolute http(s) links found on the page, fragments stripped, in document order
    pub links: Vec<Url>,
}

impl PageContent {
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

fn selector(css: &str) -> Result<Selector, CrawlError> {
    Selector::parse(css)
        .map_err(|e| CrawlError::HtmlParse(format!("Failed to parse selector '{}': {}", css, e)))
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn element_text(element: ElementRef<'_>) -> String {
    normalize_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

fn visible_text(document: &Html) -> String {
    let mut parts = Vec::new();
    for node in document.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|element| HIDDEN_ELEMENTS.contains(&element.name()))
        });
        if !hidden {
            parts.push(&**text);
        }
    }
    normalize_whitespace(&parts.join(" "))
}

fn extract_title(document: &Html, base_url: &Url) -> Result<String, CrawlError> {
    let title = document
        .select(&selector("title")?)
        .next()
        .map(element_text)
        .filter(|title| !title.is_empty());
    Ok(title.unwrap_or_else(|| base_url.to_string()))
}

fn extract_text(document: &Html) -> Result<String, CrawlError> {
    let container = match document.select(&selector("article")?).next() {
        Some(article) => Some(article),
        None => document.select(&selector("main")?).next(),
    };

    let mut fragments: Vec<String> = match container {
        Some(container) => container
            .select(&selector("p, h1, h2, h3, li")?)
            .map(element_text)
            .collect(),
        None => document.select(&selector("p")?).map(element_text).collect(),
    };
    if fragments.is_empty() {
        fragments.push(visible_text(document));
    }

    Ok(fragments
        .into_iter()
        .filter(|fragment| fragment.chars().count() > MIN_FRAGMENT_CHARS)
        .collect::<Vec<_>>()
        .join("\n\n"))
}

/// Resolve an href against the page URL.
///
/// Returns `None` for unparseable hrefs and non-http(s) schemes. The fragment
/// is stripped so anchors within one page share a single visited entry.
pub fn resolve_link(base_url: &Url, href: &str) -> Option<Url> {
    let mut url = base_url.join(href.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.set_fragment(None);
    Some(url)
}

/// Extract the title and primary text of a page.
///
/// Text comes from the first `article`, else the first `main`, else every
/// paragraph in the document, else the whole visible text.
pub fn extract_content(html: &str, base_url: &Url) -> Result<(String, String), CrawlError> {
    let document = Html::parse_document(html);
    Ok((extract_title(&document, base_url)?, extract_text(&document)?))
}

/// Extract title, primary text and outbound links in one parse.
pub fn extract_page(html: &str, base_url: &Url) -> Result<PageContent, CrawlError> {
    let document = Html::parse_document(html);
    let links = document
        .select(&selector("a[href]")?)
        .filter_map(|anchor| anchor.value().attr("href"))
        .filter_map(|href| resolve_link(base_url, href))
        .collect();

    Ok(PageContent {
        title: extract_title(&document, base_url)?,
        text: extract_text(&document)?,
        links,
    })
}
