use async_trait::async_trait;

use super::config::{BackendStyle, DecodingConfig};
use super::error::ProviderError;

#[async_trait]
/// One request attempt against a text-generation provider.
///
/// Implementations make exactly one network round-trip per prompt group and never retry;
/// retrying belongs to [`super::with_retry`].
pub trait CompletionBackend: Send + Sync {
    /// Short provider label for logs.
    fn name(&self) -> &str;

    fn style(&self) -> BackendStyle;

    /// Completes `prompts`, returning `prompts.len() * config.completions_per_prompt()` texts
    /// grouped by prompt in input order.
    async fn complete(
        &self,
        prompts: &[String],
        config: &DecodingConfig,
    ) -> Result<Vec<String>, ProviderError>;
}
