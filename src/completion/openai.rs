//! OpenAI-compatible HTTP backends (chat and legacy completion shapes).

use async_openai::types::chat::CreateChatCompletionResponse;
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::constants::CHAT_SYSTEM_PROMPT;

use super::backend::CompletionBackend;
use super::config::{BackendStyle, DecodingConfig};
use super::error::ProviderError;

/// Default OpenAI API root.
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Endpoint and key for an OpenAI-compatible provider.
#[derive(Clone)]
pub struct ProviderCredentials {
    pub api_key: String,
    pub base_url: String,
    /// Sent as `OpenAI-Organization` when set.
    pub organization: Option<String>,
}

impl std::fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderCredentials")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("organization", &self.organization)
            .finish()
    }
}

impl ProviderCredentials {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            organization: None,
        }
    }

    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[derive(Debug, Clone)]
struct OpenAiHttp {
    http: HttpClient,
    credentials: ProviderCredentials,
}

impl OpenAiHttp {
    async fn post(&self, path: &str, body: &Value) -> Result<String, ProviderError> {
        let mut request = self
            .http
            .post(self.credentials.url(path))
            .bearer_auth(&self.credentials.api_key)
            .json(body);
        if let Some(org) = &self.credentials.organization {
            request = request.header("OpenAI-Organization", org);
        }

        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        let text = response.text().await.map_err(map_reqwest_error)?;

        if status.is_success() {
            Ok(text)
        } else {
            debug!(status = status.as_u16(), "Provider returned error status");
            Err(ProviderError::from_status(
                status.as_u16(),
                error_message(&text),
            ))
        }
    }
}

fn map_reqwest_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout
    } else {
        ProviderError::Transport(e.to_string())
    }
}

/// Extracts `error.code` and `error.message` from an OpenAI error body, falling back to the
/// raw body.
fn error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: ErrorDetail,
    }

    #[derive(Deserialize)]
    struct ErrorDetail {
        #[serde(default)]
        message: String,
        #[serde(default)]
        code: Option<Value>,
    }

    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => match parsed.error.code {
            Some(Value::String(code)) => format!("{}: {}", code, parsed.error.message),
            _ => parsed.error.message,
        },
        Err(_) => body.trim().to_string(),
    }
}

fn stop_value(config: &DecodingConfig) -> Value {
    if config.stop_sequences.is_empty() {
        Value::Null
    } else {
        json!(config.stop_sequences)
    }
}

/// Chat-completions backend: one request per prompt, each a system turn plus one user turn.
#[derive(Debug, Clone)]
pub struct OpenAiChatBackend {
    inner: OpenAiHttp,
}

impl OpenAiChatBackend {
    pub fn new(credentials: ProviderCredentials) -> Self {
        Self::with_http_client(credentials, HttpClient::new())
    }

    pub fn with_http_client(credentials: ProviderCredentials, http: HttpClient) -> Self {
        Self {
            inner: OpenAiHttp { http, credentials },
        }
    }

    fn request_body(prompt: &str, config: &DecodingConfig) -> Value {
        json!({
            "model": config.model_name,
            "messages": [
                { "role": "system", "content": CHAT_SYSTEM_PROMPT },
                { "role": "user", "content": prompt },
            ],
            "max_tokens": config.max_output_tokens,
            "temperature": config.temperature,
            "top_p": config.top_p,
            "n": config.completions_per_prompt(),
            "stop": stop_value(config),
            "presence_penalty": config.presence_penalty,
            "frequency_penalty": config.frequency_penalty,
        })
    }
}

#[async_trait]
impl CompletionBackend for OpenAiChatBackend {
    fn name(&self) -> &str {
        "openai-chat"
    }

    fn style(&self) -> BackendStyle {
        BackendStyle::Chat
    }

    async fn complete(
        &self,
        prompts: &[String],
        config: &DecodingConfig,
    ) -> Result<Vec<String>, ProviderError> {
        let mut texts = Vec::with_capacity(prompts.len() * config.completions_per_prompt());

        for prompt in prompts {
            let body = Self::request_body(prompt, config);
            let raw = self.inner.post("chat/completions", &body).await?;
            let response: CreateChatCompletionResponse = serde_json::from_str(&raw)
                .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

            let mut choices = response.choices;
            choices.sort_by_key(|c| c.index);
            texts.extend(
                choices
                    .into_iter()
                    .map(|c| c.message.content.unwrap_or_default()),
            );
        }

        Ok(texts)
    }
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    #[serde(default)]
    text: String,
    #[serde(default)]
    index: u32,
}

/// Legacy completions backend: all prompts of a group go out as one `prompt` array.
#[derive(Debug, Clone)]
pub struct OpenAiCompletionBackend {
    inner: OpenAiHttp,
}

impl OpenAiCompletionBackend {
    pub fn new(credentials: ProviderCredentials) -> Self {
        Self::with_http_client(credentials, HttpClient::new())
    }

    pub fn with_http_client(credentials: ProviderCredentials, http: HttpClient) -> Self {
        Self {
            inner: OpenAiHttp { http, credentials },
        }
    }

    fn request_body(prompts: &[String], config: &DecodingConfig) -> Value {
        json!({
            "model": config.model_name,
            "prompt": prompts,
            "max_tokens": config.max_output_tokens,
            "temperature": config.temperature,
            "top_p": config.top_p,
            "n": config.completions_per_prompt(),
            "stop": stop_value(config),
            "presence_penalty": config.presence_penalty,
            "frequency_penalty": config.frequency_penalty,
        })
    }
}

#[async_trait]
impl CompletionBackend for OpenAiCompletionBackend {
    fn name(&self) -> &str {
        "openai-completion"
    }

    fn style(&self) -> BackendStyle {
        BackendStyle::Completion
    }

    async fn complete(
        &self,
        prompts: &[String],
        config: &DecodingConfig,
    ) -> Result<Vec<String>, ProviderError> {
        let body = Self::request_body(prompts, config);
        let raw = self.inner.post("completions", &body).await?;
        let response: CompletionResponse = serde_json::from_str(&raw)
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        // Choice `index` runs across the whole prompt array, `n` per prompt.
        let mut choices = response.choices;
        choices.sort_by_key(|c| c.index);
        Ok(choices.into_iter().map(|c| c.text).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_prefers_code() {
        let body = r#"{"error": {"message": "This model's maximum context length is 4097 tokens", "code": "context_length_exceeded"}}"#;
        let msg = error_message(body);
        assert!(msg.starts_with("context_length_exceeded: "));
        assert!(matches!(
            ProviderError::from_status(400, msg),
            ProviderError::ContextOverflow { .. }
        ));
    }

    #[test]
    fn test_error_message_raw_body() {
        assert_eq!(error_message("  upstream exploded "), "upstream exploded");
    }

    #[test]
    fn test_chat_request_body_shape() {
        let config = DecodingConfig::new("gpt-4o-mini").with_max_output_tokens(100);
        let body = OpenAiChatBackend::request_body("hello", &config);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], CHAT_SYSTEM_PROMPT);
        assert_eq!(body["messages"][1]["content"], "hello");
        assert_eq!(body["max_tokens"], 100);
        assert!(body["stop"].is_null());
    }

    #[test]
    fn test_completion_request_body_is_array() {
        let mut config = DecodingConfig::new("text-davinci-003");
        config.stop_sequences = vec!["\n\n\n".to_string()];
        let prompts = vec!["a".to_string(), "b".to_string()];
        let body = OpenAiCompletionBackend::request_body(&prompts, &config);
        assert_eq!(body["prompt"], json!(["a", "b"]));
        assert_eq!(body["stop"], json!(["\n\n\n"]));
    }

    #[test]
    fn test_credentials_debug_redacts_key() {
        let creds = ProviderCredentials::new("sk-secret", DEFAULT_API_BASE);
        let rendered = format!("{:?}", creds);
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("redacted"));
    }

    #[test]
    fn test_credentials_url_join() {
        let creds = ProviderCredentials::new("k", "http://localhost:9999/v1/");
        assert_eq!(
            creds.url("chat/completions"),
            "http://localhost:9999/v1/chat/completions"
        );
    }
}
