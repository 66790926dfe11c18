//! Error types for the support collaborators

use crate::error::Error as CrateError;
use crate::model::ModelError;
use crate::search::SearchError;
use thiserror::Error;

/// Errors raised while classifying, triaging or chatting about tickets
#[derive(Debug, Error)]
pub enum SupportError {
    /// The language-model call failed
    #[error("Oracle error: {0}")]
    Oracle(#[from] ModelError),

    /// The oracle answered, but not with the JSON we asked for
    #[error("Malformed {expected} reply: {message}")]
    MalformedReply {
        expected: &'static str,
        message: String,
    },

    /// Answering through the documentation index failed
    #[error("Answer error: {0}")]
    Answer(#[from] SearchError),

    /// No live-chat session with this id exists
    #[error("Unknown chat session: {0}")]
    UnknownSession(String),
}

impl From<SupportError> for CrateError {
    fn from(err: SupportError) -> Self {
        match err {
            SupportError::Oracle(e) => e.into(),
            SupportError::Answer(e) => e.into(),
            _ => CrateError::Support(err.to_string()),
        }
    }
}
