//! Client-side rate limiting for embedding models.

use std::sync::Arc;

use governor::DefaultDirectRateLimiter;
use rig::embeddings::{Embedding, EmbeddingError, EmbeddingModel};
use tracing::{Instrument, debug_span, info_span};

/// Waits for a `governor` permit before every embedding batch.
///
/// One permit covers one batch, so larger batches stretch the quota further.
#[derive(Clone)]
pub struct RateLimitedEmbeddingModel<M: EmbeddingModel> {
    model: M,
    limiter: Arc<DefaultDirectRateLimiter>,
}

impl<M> RateLimitedEmbeddingModel<M>
where
    M: EmbeddingModel,
{
    pub fn new(model: M, limiter: DefaultDirectRateLimiter) -> Self {
        Self {
            model,
            limiter: Arc::new(limiter),
        }
    }
}

impl<M: EmbeddingModel> EmbeddingModel for RateLimitedEmbeddingModel<M> {
    const MAX_DOCUMENTS: usize = M::MAX_DOCUMENTS;

    fn ndims(&self) -> usize {
        self.model.ndims()
    }

    async fn embed_texts(
        &self,
        texts: impl IntoIterator<Item = String> + Send,
    ) -> Result<Vec<Embedding>, EmbeddingError> {
        self.limiter
            .until_ready()
            .instrument(debug_span!("embedding_limiter"))
            .await;
        self.model
            .embed_texts(texts)
            .instrument(info_span!("oracle_embedding"))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::mock_model::MockEmbeddingModel;
    use governor::{Quota, RateLimiter};
    use std::num::NonZeroU32;

    #[tokio::test]
    async fn test_rate_limited_embedding_delegates() {
        let limiter = RateLimiter::direct(Quota::per_second(NonZeroU32::new(100).unwrap()));
        let model = RateLimitedEmbeddingModel::new(
            MockEmbeddingModel::with_vocabulary(["connector"]),
            limiter,
        );

        let embeddings = model
            .embed_texts(vec!["connector setup".to_string()])
            .await
            .unwrap();
        assert_eq!(model.ndims(), 2);
        assert_eq!(embeddings[0].vec, vec![1.0, 1.0]);
    }
}
