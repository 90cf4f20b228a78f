use thiserror::Error;

/// How the retry policy treats a [`ProviderError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Sleep the backoff interval and retry, consuming retry budget.
    Transient,
    /// Shrink `max_output_tokens` and retry immediately.
    ContextOverflow,
    /// Surface to the caller without retrying.
    Fatal,
}

/// Failure of a single request attempt.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("rate limited by provider: {message}")]
    RateLimited { message: String },

    #[error("request timed out")]
    Timeout,

    #[error("provider server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed provider response: {0}")]
    InvalidResponse(String),

    #[error("prompt and response exceed the context window: {message}")]
    ContextOverflow { message: String },

    #[error("provider rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
}

impl ProviderError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ProviderError::RateLimited { .. }
            | ProviderError::Timeout
            | ProviderError::Server { .. }
            | ProviderError::Transport(_)
            | ProviderError::InvalidResponse(_) => ErrorClass::Transient,
            ProviderError::ContextOverflow { .. } => ErrorClass::ContextOverflow,
            ProviderError::Rejected { .. } => ErrorClass::Fatal,
        }
    }

    /// Maps an HTTP error status and provider message onto the taxonomy.
    pub fn from_status(status: u16, message: String) -> Self {
        if is_context_overflow(&message) {
            return ProviderError::ContextOverflow { message };
        }
        match status {
            429 => ProviderError::RateLimited { message },
            408 | 504 => ProviderError::Timeout,
            500..=599 => ProviderError::Server { status, message },
            _ => ProviderError::Rejected { status, message },
        }
    }

    /// Maps a provider SDK error known only by its rendered message.
    ///
    /// Status codes are matched as whole numbers. Client errors (4xx, unknown models, invalid
    /// parameters) are rejected without retry; unrecognized messages are treated as transport
    /// failures and retried.
    pub fn from_message(message: String) -> Self {
        let lower = message.to_lowercase();
        let status = mentioned_status(&lower);

        if is_context_overflow(&lower) {
            ProviderError::ContextOverflow { message }
        } else if status == Some(429)
            || lower.contains("rate limit")
            || lower.contains("too many requests")
        {
            ProviderError::RateLimited { message }
        } else if matches!(status, Some(408 | 504))
            || lower.contains("timed out")
            || lower.contains("timeout")
        {
            ProviderError::Timeout
        } else if let Some(code @ 500..=599) = status {
            ProviderError::Server {
                status: code,
                message,
            }
        } else if lower.contains("overloaded") || lower.contains("unavailable") {
            ProviderError::Server {
                status: 503,
                message,
            }
        } else if let Some(code @ 400..=499) = status {
            ProviderError::Rejected {
                status: code,
                message,
            }
        } else if lower.contains("api key") || lower.contains("unauthorized") {
            ProviderError::Rejected {
                status: 401,
                message,
            }
        } else if CLIENT_ERROR_HINTS.iter().any(|hint| lower.contains(hint)) {
            ProviderError::Rejected {
                status: 400,
                message,
            }
        } else {
            ProviderError::Transport(message)
        }
    }
}

/// Phrases SDKs use for requests the provider will never accept.
const CLIENT_ERROR_HINTS: &[&str] = &[
    "bad request",
    "invalid request",
    "invalid_request",
    "invalid parameter",
    "invalid value",
    "invalid model",
    "unknown model",
    "model not found",
    "not_found",
    "does not exist",
    "not supported",
    "unsupported",
];

/// First standalone three-digit HTTP status (400..=599) in `message`.
///
/// `"max_tokens <= 8500"` mentions no status; `"status 500"` and `"(503)"` do.
fn mentioned_status(message: &str) -> Option<u16> {
    let bytes = message.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if !bytes[i].is_ascii_digit() {
            i += 1;
            continue;
        }
        let start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        let standalone = i - start == 3
            && (start == 0 || !bytes[start - 1].is_ascii_alphanumeric() && bytes[start - 1] != b'.')
            && (i == bytes.len() || !bytes[i].is_ascii_alphanumeric());
        if standalone
            && let Ok(code) = message[start..i].parse::<u16>()
            && (400..=599).contains(&code)
        {
            return Some(code);
        }
    }
    None
}

fn is_context_overflow(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("context_length_exceeded")
        || lower.contains("maximum context length")
        || lower.contains("please reduce your prompt")
        || lower.contains("context window")
}

/// Failure of a completion request after the retry policy gave up.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("retry budget exhausted after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: ProviderError,
    },

    #[error("unretriable provider error: {0}")]
    Fatal(#[source] ProviderError),

    #[error("context window still exceeded at max_output_tokens={max_output_tokens}: {source}")]
    ContextUnrecoverable {
        max_output_tokens: u32,
        #[source]
        source: ProviderError,
    },

    #[error("provider returned {actual} completions, expected {expected}")]
    UnexpectedCompletionCount { expected: usize, actual: usize },
}

impl CompletionError {
    /// The last provider error behind this failure, if any.
    pub fn provider_error(&self) -> Option<&ProviderError> {
        match self {
            CompletionError::RetriesExhausted { source, .. }
            | CompletionError::ContextUnrecoverable { source, .. } => Some(source),
            CompletionError::Fatal(source) => Some(source),
            CompletionError::UnexpectedCompletionCount { .. } => None,
        }
    }
}
