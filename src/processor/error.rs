//! Error types for the processor module

use crate::error::Error as CrateError;
use crate::index::DbError;
use crate::model::ModelError;
use thiserror::Error;

/// Error type for processor operations
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Chunk size and overlap do not describe an advancing window
    #[error("Invalid chunk options: {0}")]
    InvalidChunkOptions(String),

    /// Embedding generation error
    #[error("Embedding generation error: {0}")]
    Embedding(#[from] ModelError),

    /// Writing to the index failed
    #[error("Index write error: {0}")]
    Index(#[from] DbError),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl From<ProcessError> for CrateError {
    fn from(err: ProcessError) -> Self {
        match err {
            ProcessError::InvalidChunkOptions(msg) => CrateError::Config(msg),
            ProcessError::Embedding(e) => e.into(),
            ProcessError::Index(e) => e.into(),
            ProcessError::Other(msg) => CrateError::Process(msg),
        }
    }
}
