//! Client-side rate limiting for completion models.

use std::sync::Arc;

use governor::DefaultDirectRateLimiter;
use rig::completion::{CompletionError, CompletionModel, CompletionRequest, CompletionResponse};
use tracing::{Instrument, debug_span, info_span};

use super::RateLimitResponse;

/// Waits for a `governor` permit before every completion call.
#[derive(Clone)]
pub struct RateLimitedCompletionModel<M: CompletionModel> {
    model: M,
    limiter: Arc<DefaultDirectRateLimiter>,
}

impl<M> RateLimitedCompletionModel<M>
where
    M: CompletionModel,
{
    pub fn new(model: M, limiter: DefaultDirectRateLimiter) -> Self {
        Self {
            model,
            limiter: Arc::new(limiter),
        }
    }
}

impl<M: CompletionModel> CompletionModel for RateLimitedCompletionModel<M> {
    type Response = RateLimitResponse<M::Response>;

    async fn completion(
        &self,
        completion_request: CompletionRequest,
    ) -> Result<CompletionResponse<Self::Response>, CompletionError> {
        self.limiter
            .until_ready()
            .instrument(debug_span!("completion_limiter"))
            .await;
        let response = self
            .model
            .completion(completion_request)
            .instrument(info_span!("oracle_completion"))
            .await?;
        Ok(CompletionResponse {
            choice: response.choice,
            raw_response: RateLimitResponse {
                response: response.raw_response,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Client;
    use crate::model::mock_model::{MockCompletionModel, MockEmbeddingModel};
    use governor::{Quota, RateLimiter};
    use std::num::NonZeroU32;

    #[tokio::test]
    async fn test_rate_limited_completion_delegates() {
        let inner = MockCompletionModel::new();
        inner.set_text_response("limited reply").await;
        let limiter = RateLimiter::direct(Quota::per_second(NonZeroU32::new(100).unwrap()));
        let client = Client::from_models(
            RateLimitedCompletionModel::new(inner.clone(), limiter),
            MockEmbeddingModel::with_vocabulary(["x"]),
            "mock-embedding",
        );

        let reply = client.invoke("hello", None).await.unwrap();
        assert_eq!(reply, "limited reply");
        assert_eq!(inner.call_count(), 1);
    }
}
