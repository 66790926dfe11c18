//! # Mock Models for Testing
//!
//! Provides a `MockCompletionModel` that implements the `CompletionModel` trait
//! and a `MockEmbeddingModel` that implements `EmbeddingModel`, so the RAG
//! pipeline can run end to end without network access.
//!
//! The embedding mock counts occurrences of a fixed vocabulary. The first
//! dimension is a constant bias so no text ever maps to the zero vector, which
//! keeps cosine distance defined for every document.

use rig::{
    completion::{
        AssistantContent, CompletionError, CompletionModel, CompletionRequest, CompletionResponse,
    },
    embeddings::{Embedding, EmbeddingError, EmbeddingModel},
    one_or_many::OneOrMany,
};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
enum MockReply {
    Text(String),
    Error(String),
}

/// A mock completion model for testing purposes.
///
/// Queued replies are consumed first, one per call; after that every call
/// returns the fallback reply (an empty text unless one was set).
#[derive(Debug, Clone)]
pub struct MockCompletionModel {
    queued: Arc<Mutex<VecDeque<MockReply>>>,
    fallback: Arc<Mutex<Option<MockReply>>>,
    calls: Arc<AtomicUsize>,
}

impl MockCompletionModel {
    /// Creates a new mock model that will return a default empty success response.
    pub fn new() -> Self {
        Self {
            queued: Arc::new(Mutex::new(VecDeque::new())),
            fallback: Arc::new(Mutex::new(None)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Every call without a queued reply returns this text.
    pub async fn set_text_response(&self, text: &str) {
        *self.fallback.lock().await = Some(MockReply::Text(text.to_string()));
    }

    /// Every call without a queued reply fails with a provider error.
    pub async fn set_error(&self, message: &str) {
        *self.fallback.lock().await = Some(MockReply::Error(message.to_string()));
    }

    /// Queue a reply for the next unanswered call.
    pub async fn queue_text_response(&self, text: &str) {
        self.queued
            .lock()
            .await
            .push_back(MockReply::Text(text.to_string()));
    }

    /// Number of completion calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockCompletionModel {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionModel for MockCompletionModel {
    type Response = String;

    async fn completion(
        &self,
        _completion_request: CompletionRequest,
    ) -> Result<CompletionResponse<Self::Response>, CompletionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let queued = self.queued.lock().await.pop_front();
        let reply = match queued {
            Some(reply) => Some(reply),
            None => self.fallback.lock().await.clone(),
        };
        match reply {
            Some(MockReply::Error(message)) => Err(CompletionError::ProviderError(message)),
            Some(MockReply::Text(text)) => Ok(CompletionResponse {
                choice: OneOrMany::one(AssistantContent::text(text.as_str())),
                raw_response: text,
            }),
            None => Ok(CompletionResponse {
                choice: OneOrMany::one(AssistantContent::text("")),
                raw_response: "".to_string(),
            }),
        }
    }
}

/// A deterministic keyword-count embedding model.
#[derive(Debug, Clone)]
pub struct MockEmbeddingModel {
    vocabulary: Arc<Vec<String>>,
    fail_after_calls: Option<usize>,
    calls: Arc<AtomicUsize>,
}

impl MockEmbeddingModel {
    /// Creates a model with one dimension per vocabulary word plus the bias dimension.
    pub fn with_vocabulary<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            vocabulary: Arc::new(
                words
                    .into_iter()
                    .map(|word| word.as_ref().to_lowercase())
                    .collect(),
            ),
            fail_after_calls: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Succeed for the first `calls` batches, then fail every later batch.
    pub fn failing_after(mut self, calls: usize) -> Self {
        self.fail_after_calls = Some(calls);
        self
    }

    /// Number of `embed_texts` calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn vectorize(&self, text: &str) -> Vec<f64> {
        let mut vec = vec![0.0; self.vocabulary.len() + 1];
        vec[0] = 1.0;
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|token| !token.is_empty())
        {
            let token = token.to_lowercase();
            if let Some(pos) = self.vocabulary.iter().position(|word| *word == token) {
                vec[pos + 1] += 1.0;
            }
        }
        vec
    }
}

impl EmbeddingModel for MockEmbeddingModel {
    const MAX_DOCUMENTS: usize = 256;

    fn ndims(&self) -> usize {
        self.vocabulary.len() + 1
    }

    async fn embed_texts(
        &self,
        texts: impl IntoIterator<Item = String> + Send,
    ) -> Result<Vec<Embedding>, EmbeddingError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_after_calls.is_some_and(|limit| call >= limit) {
            return Err(EmbeddingError::ProviderError(
                "mock embedding quota exhausted".to_string(),
            ));
        }
        Ok(texts
            .into_iter()
            .map(|document| {
                let vec = self.vectorize(&document);
                Embedding { document, vec }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_queued_replies_before_fallback() {
        let model = MockCompletionModel::new();
        model.queue_text_response("first").await;
        model.set_text_response("always").await;

        let queued = model.queued.lock().await.len();
        assert_eq!(queued, 1);
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_embedding_counts_vocabulary() {
        let model = MockEmbeddingModel::with_vocabulary(["sso", "okta"]);
        let embeddings = model
            .embed_texts(vec!["Configure SSO with Okta; SSO again".to_string()])
            .await
            .unwrap();

        assert_eq!(embeddings[0].vec, vec![1.0, 2.0, 1.0]);
        assert_eq!(model.ndims(), 3);
    }

    #[tokio::test]
    async fn test_embedding_failure_after_limit() {
        let model = MockEmbeddingModel::with_vocabulary(["a"]).failing_after(1);
        assert!(model.embed_texts(vec!["a".to_string()]).await.is_ok());
        assert!(model.embed_texts(vec!["a".to_string()]).await.is_err());
        assert_eq!(model.call_count(), 2);
    }
}
