//! Paper-sift library crate (used by the `paper-sift` binary and integration tests).
//!
//! Scores a day's paper listing against a free-text statement of interest with a
//! text-generation model, keeps only verified records above a threshold, and reports whether
//! the model fabricated any papers along the way.
//!
//! # Public API Surface
//!
//! ## Pipeline
//! - [`Pipeline`], [`PipelineOptions`], [`DigestRun`] - Batch → call → parse → verify → select
//! - [`BatchFailurePolicy`] - Abort (default) or skip failed batches
//!
//! ## Components
//! - [`PromptBatcher`], [`FieldSet`] - Prompt rendering
//! - [`CompletionClient`], [`CompletionBackend`], [`with_retry`] - Model access and retry policy
//! - [`ResponseParser`] - Permissive record extraction
//! - [`filter`](filter::filter), [`select`](filter::select) - Title verification and cutoff
//!
//! ## Data
//! - [`Paper`], [`ScoredPaper`], [`InterestQuery`]
//!
//! ## Test/Mock Support
//! [`MockCompletionBackend`] is available behind `#[cfg(any(test, feature = "mock"))]`.

pub mod completion;
pub mod config;
pub mod constants;
pub mod filter;
pub mod hashing;
pub mod paper;
pub mod parser;
pub mod pipeline;
pub mod prompt;

pub use completion::{
    BackendStyle, CompletionBackend, CompletionClient, CompletionError, DecodingConfig,
    ErrorClass, GenaiChatBackend, OpenAiChatBackend, OpenAiCompletionBackend, ProviderCredentials,
    ProviderError, RetryPolicy, with_retry,
};
#[cfg(any(test, feature = "mock"))]
pub use completion::{MockCall, MockCompletionBackend, MockReply};
pub use config::{Config, ConfigError, ProviderKind};
pub use constants::{HALLUCINATION_WARNING, LimitsError, ScoringLimits};
pub use hashing::prompt_fingerprint;
pub use paper::{
    AnalysisField, InterestQuery, Paper, PaperError, ScoredPaper, TextOrList,
    filter_by_categories, load_papers,
};
pub use parser::{BatchResult, FieldValue, ResponseParser, ScoreRecord};
pub use pipeline::{
    BatchFailurePolicy, BatchReport, DigestRun, Pipeline, PipelineError, PipelineOptions,
    RunState, RunStats,
};
pub use prompt::{FieldSet, FieldSpec, PromptBatch, PromptBatcher};
