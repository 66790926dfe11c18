//! Index manager module for RAG
//!
//! This module owns the persisted vector store: one entry per chunk, keyed by
//! a content id derived from the chunk's source URL and ordinal, so
//! re-ingesting a page overwrites its entries instead of duplicating them.

mod database;
pub mod error;
mod schema;

pub use database::Database;
pub use error::DbError;

use chrono::{DateTime, Utc};
use rig::embeddings::Embedding;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Deterministic content id for the chunk at `index` within `url`
pub fn chunk_id(url: &str, index: usize) -> String {
    let digest = Sha256::digest(format!("{url}|||{index}").as_bytes());
    hex::encode(digest)
}

/// The embedding model and dimensionality an index was built with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddingSpace {
    pub model: String,
    pub dimensions: usize,
}

impl EmbeddingSpace {
    pub fn new(model: impl Into<String>, dimensions: usize) -> Self {
        Self {
            model: model.into(),
            dimensions,
        }
    }
}

impl fmt::Display for EmbeddingSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} dims)", self.model, self.dimensions)
    }
}

/// Source metadata stored alongside every chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// URL of the page the chunk came from
    pub source: String,

    /// Title of that page
    pub title: String,

    /// 0-based position of the chunk within the page
    pub chunk_index: usize,

    /// Number of words in the chunk
    pub word_count: usize,
}

/// A chunk ready to be written to the index
#[derive(Debug, Clone)]
pub struct IndexedChunk {
    /// Content id, see [`chunk_id`]
    pub id: String,

    /// Text of the chunk
    pub text: String,

    /// Metadata for the chunk
    pub metadata: ChunkMetadata,

    /// Embedding of the chunk text
    pub embedding: Embedding,
}

/// A stored chunk with its cosine distance to a query vector
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
    pub distance: f64,
}

/// Per-source summary of the index contents
#[derive(Debug, Clone, Serialize)]
pub struct SourceSummary {
    pub url: String,
    pub title: String,
    pub chunk_count: usize,
    pub last_indexed: DateTime<Utc>,
}
