//! # Index Error Types Module
//!
//! Error types specific to the persisted vector index: libsql failures,
//! schema setup, row decoding, and the embedding-space guard that keeps
//! query and corpus vectors in the same space.

use crate::error::Error as CrateError;
use thiserror::Error;

/// Error type for database operations
#[derive(Debug, Error)]
pub enum DbError {
    /// LibSQL error
    #[error("LibSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// SQL query error
    #[error("SQL query error: {0}")]
    Query(String),

    /// Schema error
    #[error("Schema error: {0}")]
    Schema(String),

    /// Data error
    #[error("Data error: {0}")]
    Data(String),

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Transaction error
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// The index was built with a different embedding model or dimensionality
    #[error("Embedding space mismatch: index holds {stored}, requested {requested}")]
    EmbeddingSpaceMismatch { stored: String, requested: String },

    /// A vector does not have the dimensionality recorded for the index
    #[error("Vector has {actual} dimensions, index expects {expected}")]
    Dimensions { expected: usize, actual: usize },
}

impl From<DbError> for CrateError {
    fn from(err: DbError) -> Self {
        CrateError::Database(err.to_string())
    }
}
