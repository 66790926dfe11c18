//! # LLM Client Module
//!
//! This module provides the two hosted oracles the support assistant depends on:
//! a language model that turns a prompt into text, and an embedding model that
//! turns text into fixed-dimension vectors. Both sit behind client-side rate
//! limiting so ingestion runs cannot exhaust provider quotas.
//!
//! ## Key Components
//!
//! - `Client`: Wraps a completion model and an embedding model, and remembers the
//!   embedding model name so the index can verify embedding-space consistency
//! - `RateLimitedCompletionModel` / `RateLimitedEmbeddingModel`: `governor` wrappers
//! - `EmbeddingConversion`: Conversions between `rig` embeddings and libsql blobs
//! - `mock_model`: Deterministic stand-ins for tests
//!
//! ## Providers
//!
//! - Gemini for both completion and embedding (`GEMINI_API_KEY`)
//! - An OpenAI-compatible chat router for completion (`HF_TOKEN`, `HF_MODEL`,
//!   optional `HF_API_URL`), with Gemini embeddings so the vector space does not
//!   depend on which chat model answers

use std::num::NonZeroU32;

use governor::{Quota, RateLimiter};
use ratelimited_completion::RateLimitedCompletionModel;
use ratelimited_embedding::RateLimitedEmbeddingModel;
use rig::{
    agent::AgentBuilder,
    completion::{Chat, CompletionModel, Prompt},
    embeddings::{Embedding, EmbeddingModel},
    message::Message,
    providers::{gemini, openai},
};
use tracing::{debug, instrument};

pub mod embedding;
pub mod error;
pub mod mock_model;
pub mod ratelimited_completion;
pub mod ratelimited_embedding;

pub use embedding::EmbeddingConversion;
pub use error::ModelError;

/// Completion model used with a Gemini key
pub const GEMINI_COMPLETION_MODEL: &str = "gemini-2.0-flash";

/// Base URL of the OpenAI-compatible chat router
pub const DEFAULT_ROUTER_URL: &str = "https://router.huggingface.co/v1";

/// Gemini completion + Gemini embeddings
pub type GeminiClient = Client<
    RateLimitedCompletionModel<gemini::completion::CompletionModel>,
    RateLimitedEmbeddingModel<gemini::embedding::EmbeddingModel>,
>;

/// Router completion + Gemini embeddings
pub type RouterClient = Client<
    RateLimitedCompletionModel<openai::CompletionModel>,
    RateLimitedEmbeddingModel<gemini::embedding::EmbeddingModel>,
>;

#[derive(Debug, Clone)]
pub struct Client<C, E>
where
    C: CompletionModel,
    E: EmbeddingModel,
{
    completion_model: C,
    embedding_model: E,
    embedding_model_name: String,
}

pub struct RateLimitResponse<T> {
    #[allow(dead_code)]
    response: T,
}

fn per_minute(requests: u32) -> Quota {
    Quota::per_minute(NonZeroU32::new(requests).unwrap_or(NonZeroU32::MIN))
}

fn read_env(key: &str) -> Result<String, ModelError> {
    std::env::var(key).map_err(|_| ModelError::MissingConfig(format!("{key} must be set")))
}

fn gemini_embeddings(
    gemini_client: &gemini::Client,
) -> RateLimitedEmbeddingModel<gemini::embedding::EmbeddingModel> {
    RateLimitedEmbeddingModel::new(
        gemini_client.embedding_model(gemini::embedding::EMBEDDING_004),
        RateLimiter::direct(per_minute(1000)),
    )
}

impl GeminiClient {
    pub fn new_gemini_from_env() -> Result<Self, ModelError> {
        let gemini_api_key = read_env("GEMINI_API_KEY")?;
        Ok(Self::new_gemini(gemini::Client::new(&gemini_api_key)))
    }

    pub fn new_gemini(gemini_client: gemini::Client) -> Self {
        let completion_model = RateLimitedCompletionModel::new(
            gemini_client.completion_model(GEMINI_COMPLETION_MODEL),
            RateLimiter::direct(per_minute(2000)),
        );
        Self {
            completion_model,
            embedding_model: gemini_embeddings(&gemini_client),
            embedding_model_name: gemini::embedding::EMBEDDING_004.to_string(),
        }
    }
}

impl RouterClient {
    /// Chat completions through the router, embeddings through Gemini.
    pub fn new_router_from_env() -> Result<Self, ModelError> {
        let token = read_env("HF_TOKEN")?;
        let model = read_env("HF_MODEL")?;
        let base_url = std::env::var("HF_API_URL")
            .map(|url| {
                url.trim_end_matches('/')
                    .trim_end_matches("/chat/completions")
                    .to_string()
            })
            .unwrap_or_else(|_| DEFAULT_ROUTER_URL.to_string());
        let gemini_client = gemini::Client::new(&read_env("GEMINI_API_KEY")?);
        debug!(%base_url, %model, "using chat router");

        let router = openai::Client::from_url(&token, &base_url);
        let completion_model = RateLimitedCompletionModel::new(
            router.completion_model(&model),
            RateLimiter::direct(per_minute(60)),
        );
        Ok(Self {
            completion_model,
            embedding_model: gemini_embeddings(&gemini_client),
            embedding_model_name: gemini::embedding::EMBEDDING_004.to_string(),
        })
    }
}

impl<C, E> Client<C, E>
where
    C: CompletionModel + 'static,
    E: EmbeddingModel,
{
    /// Build a client from already-configured models.
    pub fn from_models(
        completion_model: C,
        embedding_model: E,
        embedding_model_name: impl Into<String>,
    ) -> Self {
        Self {
            completion_model,
            embedding_model,
            embedding_model_name: embedding_model_name.into(),
        }
    }

    pub fn completion(&self) -> &C {
        &self.completion_model
    }

    pub fn embedding(&self) -> &E {
        &self.embedding_model
    }

    pub fn embedding_model_name(&self) -> &str {
        &self.embedding_model_name
    }

    /// Dimensionality of the vectors produced by the embedding model
    pub fn embedding_dimensions(&self) -> usize {
        self.embedding_model.ndims()
    }

    /// Single-shot call to the language model.
    #[instrument(skip_all, fields(prompt_len = prompt.len()))]
    pub async fn invoke(&self, prompt: &str, system: Option<&str>) -> Result<String, ModelError> {
        let mut builder = AgentBuilder::new(self.completion_model.clone());
        if let Some(system) = system {
            builder = builder.preamble(system);
        }
        let agent = builder.build();
        let reply = agent.prompt(prompt).await?;
        debug!(reply_len = reply.len(), "oracle replied");
        Ok(reply)
    }

    /// Continue a conversation with the given history.
    #[instrument(skip_all, fields(history_len = history.len()))]
    pub async fn converse(
        &self,
        system: &str,
        history: Vec<Message>,
        message: &str,
        temperature: f64,
    ) -> Result<String, ModelError> {
        let agent = AgentBuilder::new(self.completion_model.clone())
            .preamble(system)
            .temperature(temperature)
            .build();
        Ok(agent.chat(message, history).await?)
    }

    /// Embed a batch of documents, one vector per input, in input order.
    #[instrument(skip_all, fields(batch = texts.len()))]
    pub async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Embedding>, ModelError> {
        let expected = texts.len();
        if expected == 0 {
            return Ok(Vec::new());
        }
        let embeddings = self.embedding_model.embed_texts(texts).await?;
        if embeddings.len() != expected {
            return Err(ModelError::EmbeddingCount {
                expected,
                actual: embeddings.len(),
            });
        }
        Ok(embeddings)
    }

    /// Embed a single query string.
    pub async fn embed_query(&self, text: &str) -> Result<Embedding, ModelError> {
        self.embed_batch(vec![text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or(ModelError::EmbeddingCount {
                expected: 1,
                actual: 0,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::mock_model::{MockCompletionModel, MockEmbeddingModel};

    fn client() -> Client<MockCompletionModel, MockEmbeddingModel> {
        Client::from_models(
            MockCompletionModel::new(),
            MockEmbeddingModel::with_vocabulary(["lineage", "glossary"]),
            "mock-embedding",
        )
    }

    #[tokio::test]
    async fn test_invoke_returns_scripted_text() {
        let client = client();
        client.completion().set_text_response("hello there").await;

        let reply = client.invoke("hi", Some("be brief")).await.unwrap();
        assert_eq!(reply, "hello there");
        assert_eq!(client.completion().call_count(), 1);
    }

    #[tokio::test]
    async fn test_invoke_surfaces_oracle_failure() {
        let client = client();
        client.completion().set_error("503 Service Unavailable").await;

        let result = client.invoke("hi", None).await;
        assert!(matches!(result, Err(ModelError::Prompt(_))));
    }

    #[tokio::test]
    async fn test_embed_batch_preserves_order_and_count() {
        let client = client();
        let texts = vec!["glossary terms".to_string(), "lineage graph".to_string()];

        let embeddings = client.embed_batch(texts).await.unwrap();
        assert_eq!(embeddings.len(), 2);
        assert_eq!(embeddings[0].vec, vec![1.0, 0.0, 1.0]);
        assert_eq!(embeddings[1].vec, vec![1.0, 1.0, 0.0]);
        assert_eq!(client.embedding_dimensions(), 3);
    }

    #[tokio::test]
    async fn test_embed_batch_empty_input() {
        let client = client();
        assert!(client.embed_batch(Vec::new()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_embed_query() {
        let client = client();
        let embedding = client.embed_query("Lineage?").await.unwrap();
        assert_eq!(embedding.document, "Lineage?");
        assert_eq!(embedding.vec, vec![1.0, 1.0, 0.0]);
    }
}
