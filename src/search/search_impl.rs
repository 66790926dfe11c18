//! Retrieval over the persisted index

use super::error::SearchError;
use crate::index::{ChunkMetadata, Database, DbError, ScoredChunk};
use crate::model::{Client, EmbeddingConversion};
use rig::{completion::CompletionModel, embeddings::EmbeddingModel};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Options for search queries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOptions {
    /// Maximum number of results to return
    pub limit: usize,

    /// Only return chunks whose source URL contains this string
    pub source_filter: Option<String>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: 5,
            source_filter: None,
        }
    }
}

impl SearchOptions {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }
}

/// Search result with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Content id of the chunk
    pub chunk_id: String,

    /// Text content of the chunk
    pub text: String,

    /// Source metadata of the chunk
    pub metadata: ChunkMetadata,

    /// Cosine similarity to the query, `1 - distance`
    pub score: f64,
}

impl From<ScoredChunk> for SearchResult {
    fn from(chunk: ScoredChunk) -> Self {
        Self {
            chunk_id: chunk.id,
            text: chunk.text,
            metadata: chunk.metadata,
            score: 1.0 - chunk.distance,
        }
    }
}

/// Embed `query` and return up to `options.limit` chunks, most similar first.
///
/// The query is embedded with the client's embedding model, which must be the
/// model the index was built with.
#[instrument(skip(db, client, options), fields(limit = options.limit))]
pub async fn search_index<C, E>(
    db: &Database,
    client: &Client<C, E>,
    query: &str,
    options: &SearchOptions,
) -> Result<Vec<SearchResult>, SearchError>
where
    C: CompletionModel + 'static,
    E: EmbeddingModel,
{
    if options.limit == 0 {
        return Err(SearchError::InvalidParameters(
            "limit must be at least 1".to_string(),
        ));
    }
    let space = db.embedding_space();
    if space.model != client.embedding_model_name() {
        return Err(DbError::EmbeddingSpaceMismatch {
            stored: space.to_string(),
            requested: client.embedding_model_name().to_string(),
        }
        .into());
    }

    let embedding = client
        .embed_query(query)
        .await
        .map_err(|e| SearchError::Embedding(format!("Failed to generate embedding: {}", e)))?;

    let results: Vec<SearchResult> = db
        .nearest(&embedding.to_vec(), options.limit, options.source_filter.as_deref())
        .await?
        .into_iter()
        .map(SearchResult::from)
        .collect();

    debug!(found = results.len(), "retrieved chunks");
    Ok(results)
}
