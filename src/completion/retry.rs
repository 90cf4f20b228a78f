//! Bounded retry combinator for a single completion request.

use std::future::Future;

use tracing::{debug, error, warn};

use super::config::{DecodingConfig, RetryPolicy};
use super::error::{CompletionError, ErrorClass, ProviderError};

/// Result of a request that eventually succeeded.
#[derive(Debug, Clone, PartialEq)]
pub struct Retried<T> {
    pub value: T,
    /// Attempts made, including the successful one.
    pub attempts: u32,
    /// Token budget of the successful attempt (lower than requested after a shrink).
    pub max_output_tokens: u32,
}

/// Runs `attempt` until it succeeds or the policy gives up.
///
/// - every attempt is preceded by `policy.pre_call_delay`
/// - [`ErrorClass::Transient`]: sleep `policy.backoff`, consume one unit of `retry_budget`
/// - [`ErrorClass::ContextOverflow`]: shrink `max_output_tokens`, retry without sleeping and
///   without consuming budget
/// - [`ErrorClass::Fatal`]: return immediately
///
/// `decoding` is this request's private copy; each attempt receives a clone of its current
/// state.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    mut decoding: DecodingConfig,
    mut attempt: F,
) -> Result<Retried<T>, CompletionError>
where
    F: FnMut(DecodingConfig) -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut budget = policy.retry_budget;
    let mut attempts: u32 = 0;

    loop {
        if !policy.pre_call_delay.is_zero() {
            tokio::time::sleep(policy.pre_call_delay).await;
        }
        attempts += 1;

        let call = attempt(decoding.clone());
        let outcome = match policy.request_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .unwrap_or(Err(ProviderError::Timeout)),
            None => call.await,
        };

        let err = match outcome {
            Ok(value) => {
                debug!(attempts, "Completion request succeeded");
                return Ok(Retried {
                    value,
                    attempts,
                    max_output_tokens: decoding.max_output_tokens,
                });
            }
            Err(err) => err,
        };

        match err.class() {
            ErrorClass::ContextOverflow => {
                let shrunk = policy.shrink(decoding.max_output_tokens);
                if shrunk == 0 || shrunk >= decoding.max_output_tokens {
                    error!(
                        max_output_tokens = decoding.max_output_tokens,
                        "Cannot shrink output budget any further"
                    );
                    return Err(CompletionError::ContextUnrecoverable {
                        max_output_tokens: decoding.max_output_tokens,
                        source: err,
                    });
                }
                warn!(
                    attempt = attempts,
                    from = decoding.max_output_tokens,
                    to = shrunk,
                    "Context window exceeded, reducing max_output_tokens and retrying"
                );
                decoding.max_output_tokens = shrunk;
            }
            ErrorClass::Transient => {
                if budget == 0 {
                    error!(attempts, error = %err, "Hit too many failures, giving up");
                    return Err(CompletionError::RetriesExhausted {
                        attempts,
                        source: err,
                    });
                }
                budget -= 1;
                warn!(
                    attempt = attempts,
                    remaining = budget,
                    error = %err,
                    backoff_secs = policy.backoff.as_secs_f64(),
                    "Transient provider error, retrying after backoff"
                );
                if !policy.backoff.is_zero() {
                    tokio::time::sleep(policy.backoff).await;
                }
            }
            ErrorClass::Fatal => {
                error!(attempt = attempts, error = %err, "Unretriable provider error");
                return Err(CompletionError::Fatal(err));
            }
        }
    }
}
