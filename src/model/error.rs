//! Error types for the model clients

use crate::error::Error as CrateError;
use rig::completion::PromptError;
use rig::embeddings::EmbeddingError;
use thiserror::Error;

/// Errors raised by the language-model and embedding oracles
#[derive(Debug, Error)]
pub enum ModelError {
    /// The completion call failed or returned a non-success status
    #[error("Completion failed: {0}")]
    Prompt(#[from] PromptError),

    /// The embedding call failed
    #[error("Embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    /// The embedding oracle returned the wrong number of vectors
    #[error("Expected {expected} embeddings, received {actual}")]
    EmbeddingCount { expected: usize, actual: usize },

    /// Required credentials or settings are missing
    #[error("Missing configuration: {0}")]
    MissingConfig(String),
}

impl From<ModelError> for CrateError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::MissingConfig(msg) => CrateError::Config(msg),
            _ => CrateError::Model(err.to_string()),
        }
    }
}
