//! Cross-cutting, shared constants.
//!
//! Defaults here mirror the behavior the pipeline is tuned for; every one of them can be
//! overridden through [`crate::config::Config`].
//!
//! # Timing Invariants
//!
//! Three independent delays govern calls to the scoring endpoint:
//!
//! 1. [`DEFAULT_PRE_CALL_DELAY_SECS`] before *every* attempt (steady-state rate limiting)
//! 2. [`DEFAULT_BACKOFF_SECS`] after a transient failure, consuming one unit of retry budget
//! 3. none after a context-overflow failure (the token budget shrinks instead)

/// Papers rendered into one prompt.
pub const DEFAULT_BATCH_SIZE: usize = 2;

/// Minimum relevancy score for a paper to reach the digest.
pub const DEFAULT_THRESHOLD: u8 = 2;

/// Upper bound of the relevancy scale.
pub const MAX_RELEVANCY_SCORE: u8 = 10;

/// Score assigned when the model's score cannot be coerced.
pub const UNPARSEABLE_SCORE: u8 = 0;

/// Placeholder substituted for a missing or unparseable analysis field.
pub const FIELD_PLACEHOLDER: &str = "N/A";

/// Transient-failure retries allowed per request before the batch fails.
pub const DEFAULT_RETRY_BUDGET: u32 = 5;

pub const DEFAULT_BACKOFF_SECS: u64 = 15;

pub const DEFAULT_PRE_CALL_DELAY_SECS: u64 = 3;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// `max_output_tokens` is multiplied by this factor after a context-overflow error.
pub const CONTEXT_SHRINK_FACTOR: f64 = 0.8;

pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 5400;

pub const DEFAULT_TEMPERATURE: f32 = 0.2;

pub const DEFAULT_TOP_P: f32 = 1.0;

pub const DEFAULT_MODEL_NAME: &str = "gpt-3.5-turbo";

/// Non-chat prompts submitted together in one completion request.
pub const DEFAULT_PROMPTS_PER_REQUEST: usize = 8;

/// System turn prepended to every chat-style prompt.
pub const CHAT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// Rendered ahead of the digest whenever a run detected fabricated papers.
pub const HALLUCINATION_WARNING: &str = "Warning: the model hallucinated some papers. We have tried to remove them, but the scores may not be accurate.";

/// Runtime tuning of the relevancy scale and batching.
///
/// The [`validate`](ScoringLimits::validate) method rejects values the pipeline cannot honor
/// before any request is made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoringLimits {
    /// Papers per prompt.
    pub batch_size: usize,
    /// Minimum score kept by the threshold selector.
    pub threshold: u8,
}

impl Default for ScoringLimits {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl ScoringLimits {
    pub fn new(batch_size: usize, threshold: u8) -> Self {
        Self {
            batch_size,
            threshold,
        }
    }

    /// Returns an error if:
    /// - `batch_size` is zero
    /// - `threshold` exceeds [`MAX_RELEVANCY_SCORE`]
    pub fn validate(&self) -> Result<(), LimitsError> {
        if self.batch_size == 0 {
            return Err(LimitsError::ZeroBatchSize);
        }
        if self.threshold > MAX_RELEVANCY_SCORE {
            return Err(LimitsError::ThresholdOutOfRange {
                threshold: self.threshold,
            });
        }
        Ok(())
    }
}

/// Error returned when [`ScoringLimits`] validation fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LimitsError {
    /// A batch must hold at least one paper.
    ZeroBatchSize,
    /// Threshold above the top of the relevancy scale would reject everything.
    ThresholdOutOfRange { threshold: u8 },
}

impl std::fmt::Display for LimitsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroBatchSize => write!(f, "batch size cannot be zero"),
            Self::ThresholdOutOfRange { threshold } => write!(
                f,
                "threshold {} is above the maximum relevancy score {}",
                threshold, MAX_RELEVANCY_SCORE
            ),
        }
    }
}

impl std::error::Error for LimitsError {}
