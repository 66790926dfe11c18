//! Search module for RAG functionality
//!
//! Query-time half of the pipeline: embed the question, find the nearest
//! chunks in the index, and synthesize a cited answer from them. Nothing
//! here writes to the index, so concurrent queries need no locking.

mod answer;
mod error;
mod search_impl;

pub use answer::{
    ANSWER_SYSTEM_MESSAGE, AnswerOptions, NOT_FOUND_ANSWER, TicketAnswer, build_answer_prompt,
    collect_sources, generate_answer, prepare_rag_context,
};
pub use error::SearchError;
pub use search_impl::{SearchOptions, SearchResult, search_index};

use crate::index::Database;
use crate::model::Client;
use rig::{completion::CompletionModel, embeddings::EmbeddingModel};

/// Search system for RAG
///
/// Bundles the index and the model client used at query time.
#[derive(Clone)]
pub struct SearchSystem<C, E>
where
    C: CompletionModel,
    E: EmbeddingModel,
{
    db: Database,
    client: Client<C, E>,
}

impl<C, E> SearchSystem<C, E>
where
    C: CompletionModel + 'static,
    E: EmbeddingModel,
{
    /// Create a new search system with the given database
    pub fn new(db: Database, client: Client<C, E>) -> Self {
        Self { db, client }
    }

    /// Search the index with the given query and options
    pub async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<SearchResult>, SearchError> {
        search_index(&self.db, &self.client, query, options).await
    }

    /// Retrieve context and answer a ticket
    pub async fn answer(
        &self,
        ticket_id: &str,
        topic: &str,
        query: &str,
        options: AnswerOptions,
    ) -> Result<TicketAnswer, SearchError> {
        generate_answer(&self.db, &self.client, ticket_id, topic, query, options).await
    }

    /// Get the database reference
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Get the client reference
    pub fn client(&self) -> &Client<C, E> {
        &self.client
    }
}
