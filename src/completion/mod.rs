//! Scoring-model access: provider backends, decoding parameters and the retry policy.
//!
//! A [`CompletionBackend`] performs one request attempt. [`with_retry`] wraps attempts in the
//! bounded retry policy (transient backoff, context-overflow shrink) and [`CompletionClient`]
//! groups prompts into requests on top of both.

pub mod backend;
pub mod client;
pub mod config;
pub mod error;
pub mod genai_chat;
pub mod openai;
pub mod retry;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

#[cfg(test)]
mod tests;

pub use backend::CompletionBackend;
pub use client::CompletionClient;
pub use config::{BackendStyle, DecodingConfig, RetryPolicy};
pub use error::{CompletionError, ErrorClass, ProviderError};
pub use genai_chat::GenaiChatBackend;
pub use openai::{DEFAULT_API_BASE, OpenAiChatBackend, OpenAiCompletionBackend, ProviderCredentials};
pub use retry::{Retried, with_retry};

#[cfg(any(test, feature = "mock"))]
pub use mock::{MockCall, MockCompletionBackend, MockReply};
