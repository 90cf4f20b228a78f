use async_trait::async_trait;
use genai::Client;
use genai::chat::{ChatMessage, ChatOptions, ChatRequest};
use tracing::debug;

use crate::constants::CHAT_SYSTEM_PROMPT;

use super::backend::CompletionBackend;
use super::config::{BackendStyle, DecodingConfig};
use super::error::ProviderError;

/// Multi-provider chat backend; the provider is resolved from the model name and credentials
/// come from the provider's usual environment variable (`GEMINI_API_KEY`, `ANTHROPIC_API_KEY`, ...).
#[derive(Debug, Clone, Default)]
pub struct GenaiChatBackend {
    client: Client,
}

impl GenaiChatBackend {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn options(config: &DecodingConfig) -> ChatOptions {
        let mut options = ChatOptions::default()
            .with_temperature(config.temperature as f64)
            .with_top_p(config.top_p as f64)
            .with_max_tokens(config.max_output_tokens);
        if !config.stop_sequences.is_empty() {
            options = options.with_stop_sequences(config.stop_sequences.clone());
        }
        options
    }
}

#[async_trait]
impl CompletionBackend for GenaiChatBackend {
    fn name(&self) -> &str {
        "genai"
    }

    fn style(&self) -> BackendStyle {
        BackendStyle::Chat
    }

    async fn complete(
        &self,
        prompts: &[String],
        config: &DecodingConfig,
    ) -> Result<Vec<String>, ProviderError> {
        let options = Self::options(config);
        let n = config.completions_per_prompt();
        let mut texts = Vec::with_capacity(prompts.len() * n);

        for prompt in prompts {
            // No `n` parameter across providers; sample sequentially.
            for _ in 0..n {
                let request = ChatRequest::new(vec![
                    ChatMessage::system(CHAT_SYSTEM_PROMPT),
                    ChatMessage::user(prompt.as_str()),
                ]);
                let response = self
                    .client
                    .exec_chat(&config.model_name, request, Some(&options))
                    .await
                    .map_err(|e| ProviderError::from_message(e.to_string()))?;

                let text = response.first_text().unwrap_or_default().to_string();
                debug!(model = %config.model_name, chars = text.len(), "genai completion received");
                texts.push(text);
            }
        }

        Ok(texts)
    }
}
