use std::sync::Arc;

use tracing::{debug, instrument};

use crate::constants::DEFAULT_PROMPTS_PER_REQUEST;

use super::backend::CompletionBackend;
use super::config::{BackendStyle, DecodingConfig, RetryPolicy};
use super::error::CompletionError;
use super::retry::with_retry;

/// Completion front-end: groups prompts into requests and runs each under the retry policy.
#[derive(Clone)]
pub struct CompletionClient {
    backend: Arc<dyn CompletionBackend>,
    decoding: DecodingConfig,
    policy: RetryPolicy,
    prompts_per_request: usize,
}

impl std::fmt::Debug for CompletionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionClient")
            .field("backend", &self.backend.name())
            .field("decoding", &self.decoding)
            .field("policy", &self.policy)
            .field("prompts_per_request", &self.prompts_per_request)
            .finish()
    }
}

impl CompletionClient {
    pub fn new(
        backend: Arc<dyn CompletionBackend>,
        decoding: DecodingConfig,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            backend,
            decoding,
            policy,
            prompts_per_request: DEFAULT_PROMPTS_PER_REQUEST,
        }
    }

    /// Prompts per request for completion-style backends. Chat backends always send one.
    pub fn with_prompts_per_request(mut self, prompts_per_request: usize) -> Self {
        self.prompts_per_request = prompts_per_request.max(1);
        self
    }

    pub fn decoding(&self) -> &DecodingConfig {
        &self.decoding
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// First completion for a single prompt.
    pub async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let all = self.complete_all(prompt).await?;
        Ok(all.into_iter().next().unwrap_or_default())
    }

    /// All `num_completions` completions for a single prompt.
    pub async fn complete_all(&self, prompt: &str) -> Result<Vec<String>, CompletionError> {
        let mut grouped = self.complete_many(&[prompt.to_string()]).await?;
        Ok(grouped.pop().unwrap_or_default())
    }

    /// Completes every prompt with the client's decoding parameters.
    pub async fn complete_many(
        &self,
        prompts: &[String],
    ) -> Result<Vec<Vec<String>>, CompletionError> {
        self.complete_many_with(prompts, &self.decoding).await
    }

    /// Completes every prompt, returning one group of completions per prompt in input order.
    ///
    /// `decoding` is copied per request: a context-overflow shrink in one request does not
    /// affect the next one.
    #[instrument(skip(self, prompts, decoding), fields(backend = self.backend.name(), prompts = prompts.len()))]
    pub async fn complete_many_with(
        &self,
        prompts: &[String],
        decoding: &DecodingConfig,
    ) -> Result<Vec<Vec<String>>, CompletionError> {
        let per_request = match self.backend.style() {
            BackendStyle::Chat => 1,
            BackendStyle::Completion => self.prompts_per_request,
        };
        let n = decoding.completions_per_prompt();
        let mut grouped = Vec::with_capacity(prompts.len());

        for chunk in prompts.chunks(per_request) {
            let backend = &self.backend;
            let retried = with_retry(&self.policy, decoding.clone(), |attempt_config| async move {
                backend.complete(chunk, &attempt_config).await
            })
            .await?;

            let expected = chunk.len() * n;
            if retried.value.len() != expected {
                return Err(CompletionError::UnexpectedCompletionCount {
                    expected,
                    actual: retried.value.len(),
                });
            }

            debug!(
                prompts = chunk.len(),
                attempts = retried.attempts,
                max_output_tokens = retried.max_output_tokens,
                "Completion request finished"
            );

            let mut texts = retried.value.into_iter();
            for _ in chunk {
                grouped.push(texts.by_ref().take(n).collect());
            }
        }

        Ok(grouped)
    }
}
