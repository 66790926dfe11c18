//! # supportdesk - Support Ticket Assistant with RAG
//!
//! This crate answers customer support tickets from a product's public
//! documentation. It crawls a fixed set of documentation sites, splits the pages
//! into overlapping word windows, embeds them into a persistent vector index,
//! and answers questions by retrieving the closest chunks and asking a language
//! model to respond from that context only.
//!
//! ## Features
//!
//! - Breadth-first documentation crawling with allow-listed domains and
//!   per-domain page caps
//! - Word-window chunking with overlap and deterministic content ids
//! - Vector indexing with LibSQL, guarded against mixing embedding models
//! - Semantic search and cited answer synthesis
//! - Ticket classification, routing and triage
//! - A guarded live chat that turns a conversation into a ticket
//! - Rate-limited model clients for Gemini and OpenAI-compatible routers
//!
//! ## Example
//!
//! ```rust,no_run
//! use supportdesk::index::{Database, EmbeddingSpace};
//! use supportdesk::model::GeminiClient;
//! use supportdesk::search::{AnswerOptions, SearchSystem};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = GeminiClient::new_gemini_from_env()?;
//!     let space = EmbeddingSpace::new(client.embedding_model_name(), client.embedding_dimensions());
//!     let db = Database::new_from_path("index.db", space).await?;
//!
//!     let system = SearchSystem::new(db, client);
//!     let answer = system
//!         .answer("TICKET-1", "SSO", "How do I configure Okta SSO?", AnswerOptions::default())
//!         .await?;
//!
//!     println!("{}", answer.response);
//!     for source in answer.sources {
//!         println!("- {source}");
//!     }
//!     Ok(())
//! }
//! ```

mod error;
pub mod model;

// RAG feature modules
pub mod crawler;
pub mod index;
pub mod processor;
pub mod search;

// Ticket handling on top of RAG
pub mod support;

pub use error::{Error, Result};

/// Re-export of types module for public use
pub mod prelude {
    pub use crate::crawler::{CrawledPage, CrawlerConfig, crawl_website};
    pub use crate::error::Error;
    pub use crate::error::Result;
    pub use crate::index::{Database, EmbeddingSpace};
    pub use crate::processor::{ProcessorConfig, index_pages};
    pub use crate::search::{AnswerOptions, SearchOptions, SearchSystem};
    pub use crate::support::{LiveChat, SessionStore, Ticket, triage_ticket};
}
