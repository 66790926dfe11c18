//! # Search Error Types Module
//!
//! Error types for the query path: retrieval from the index, query embedding,
//! and the single language-model call that synthesizes an answer.

use thiserror::Error;

use crate::error::Error as CrateError;
use crate::index::DbError;
use crate::model::ModelError;

/// Errors that can occur during search operations
#[derive(Debug, Error)]
pub enum SearchError {
    /// Error occurred during database operations
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    /// Error occurred while embedding the query
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// The language-model oracle failed while synthesizing an answer
    #[error("Answer generation failed: {0}")]
    Oracle(ModelError),

    /// Error occurred during result processing
    #[error("Result processing error: {0}")]
    ResultProcessing(String),

    /// Invalid search parameters
    #[error("Invalid search parameters: {0}")]
    InvalidParameters(String),
}

impl From<serde_json::Error> for SearchError {
    fn from(err: serde_json::Error) -> Self {
        SearchError::ResultProcessing(err.to_string())
    }
}

impl From<SearchError> for CrateError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::Database(e) => e.into(),
            SearchError::Oracle(e) => e.into(),
            _ => CrateError::Search(err.to_string()),
        }
    }
}
