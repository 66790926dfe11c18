//! Error types for the supportdesk crate

use thiserror::Error;

/// Result type for supportdesk operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for supportdesk operations
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Web crawling error
    #[error("Crawl error: {0}")]
    Crawl(String),

    /// Content processing error
    #[error("Process error: {0}")]
    Process(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// Search error
    #[error("Search error: {0}")]
    Search(String),

    /// Language model or embedding oracle error
    #[error("Model error: {0}")]
    Model(String),

    /// Ticket classification, routing or live chat error
    #[error("Support error: {0}")]
    Support(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}
