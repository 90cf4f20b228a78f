use std::time::Duration;

use serde::Serialize;

use crate::constants::{
    CONTEXT_SHRINK_FACTOR, DEFAULT_BACKOFF_SECS, DEFAULT_MAX_OUTPUT_TOKENS, DEFAULT_MODEL_NAME,
    DEFAULT_PRE_CALL_DELAY_SECS, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_RETRY_BUDGET,
    DEFAULT_TEMPERATURE, DEFAULT_TOP_P,
};

/// Scoring-model call parameters.
///
/// Shared across batches but always copied per request, so a context-overflow shrink in one
/// batch never leaks into another.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodingConfig {
    pub model_name: String,
    pub max_output_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    /// Completions requested per prompt (`n`).
    pub num_completions: u32,
    pub stop_sequences: Vec<String>,
    pub presence_penalty: f32,
    pub frequency_penalty: f32,
}

impl Default for DecodingConfig {
    fn default() -> Self {
        Self {
            model_name: DEFAULT_MODEL_NAME.to_string(),
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            top_p: DEFAULT_TOP_P,
            num_completions: 1,
            stop_sequences: Vec::new(),
            presence_penalty: 0.0,
            frequency_penalty: 0.0,
        }
    }
}

impl DecodingConfig {
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            ..Default::default()
        }
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }

    pub fn with_num_completions(mut self, num_completions: u32) -> Self {
        self.num_completions = num_completions;
        self
    }

    /// `num_completions` clamped to at least one.
    pub fn completions_per_prompt(&self) -> usize {
        self.num_completions.max(1) as usize
    }
}

/// Bounded retry policy around a single completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Transient failures tolerated before the request fails. Context-overflow retries do not
    /// consume this budget.
    pub retry_budget: u32,
    /// Sleep after a transient failure.
    pub backoff: Duration,
    /// Sleep before every attempt.
    pub pre_call_delay: Duration,
    /// Per-attempt timeout; `None` waits indefinitely.
    pub request_timeout: Option<Duration>,
    /// Multiplier applied to `max_output_tokens` after a context overflow.
    pub shrink_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retry_budget: DEFAULT_RETRY_BUDGET,
            backoff: Duration::from_secs(DEFAULT_BACKOFF_SECS),
            pre_call_delay: Duration::from_secs(DEFAULT_PRE_CALL_DELAY_SECS),
            request_timeout: Some(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)),
            shrink_factor: CONTEXT_SHRINK_FACTOR,
        }
    }
}

impl RetryPolicy {
    /// Policy without any sleeping; used against local endpoints and in tests.
    pub fn immediate(retry_budget: u32) -> Self {
        Self {
            retry_budget,
            backoff: Duration::ZERO,
            pre_call_delay: Duration::ZERO,
            request_timeout: None,
            shrink_factor: CONTEXT_SHRINK_FACTOR,
        }
    }

    /// Token budget after one shrink step.
    pub fn shrink(&self, max_output_tokens: u32) -> u32 {
        (max_output_tokens as f64 * self.shrink_factor) as u32
    }
}

/// Request shape expected by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendStyle {
    /// Each prompt is one user turn after a fixed system turn.
    Chat,
    /// Prompts are submitted as a raw array.
    Completion,
}

impl BackendStyle {
    /// Chat shape for the GPT-3.5/GPT-4 families, completion shape otherwise.
    pub fn infer(model_name: &str) -> Self {
        let model = model_name.to_ascii_lowercase();
        let chat_family = model.contains("gpt-3.5") || model.contains("gpt-4");
        if chat_family && !model.contains("instruct") {
            BackendStyle::Chat
        } else {
            BackendStyle::Completion
        }
    }
}

impl std::str::FromStr for BackendStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "chat" => Ok(Self::Chat),
            "completion" | "completions" => Ok(Self::Completion),
            _ => Err(format!("Unknown backend style: {}", s)),
        }
    }
}
