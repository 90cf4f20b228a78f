use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use super::*;

fn rate_limited() -> ProviderError {
    ProviderError::RateLimited {
        message: "Rate limit reached for requests".to_string(),
    }
}

fn overflow() -> ProviderError {
    ProviderError::ContextOverflow {
        message: "context_length_exceeded: Please reduce your prompt".to_string(),
    }
}

fn client(backend: Arc<MockCompletionBackend>, policy: RetryPolicy) -> CompletionClient {
    CompletionClient::new(backend, DecodingConfig::default(), policy)
}

#[test]
fn test_error_classification() {
    assert_eq!(rate_limited().class(), ErrorClass::Transient);
    assert_eq!(ProviderError::Timeout.class(), ErrorClass::Transient);
    assert_eq!(overflow().class(), ErrorClass::ContextOverflow);
    assert_eq!(
        ProviderError::Rejected {
            status: 401,
            message: "bad key".to_string()
        }
        .class(),
        ErrorClass::Fatal
    );
}

#[test]
fn test_from_status_mapping() {
    assert!(matches!(
        ProviderError::from_status(429, "slow down".into()),
        ProviderError::RateLimited { .. }
    ));
    assert!(matches!(
        ProviderError::from_status(503, "busy".into()),
        ProviderError::Server { status: 503, .. }
    ));
    assert!(matches!(
        ProviderError::from_status(400, "This model's maximum context length is 4097 tokens".into()),
        ProviderError::ContextOverflow { .. }
    ));
    assert!(matches!(
        ProviderError::from_status(401, "Incorrect API key".into()),
        ProviderError::Rejected { status: 401, .. }
    ));
}

#[test]
fn test_from_message_mapping() {
    assert_eq!(
        ProviderError::from_message("HTTP 429 Too Many Requests".into()).class(),
        ErrorClass::Transient
    );
    assert_eq!(
        ProviderError::from_message("prompt exceeds the context window".into()).class(),
        ErrorClass::ContextOverflow
    );
    assert_eq!(
        ProviderError::from_message("401 Unauthorized: invalid api key".into()).class(),
        ErrorClass::Fatal
    );
}

#[test]
fn test_from_message_matches_whole_status_codes() {
    let err = ProviderError::from_message("invalid value: max_tokens <= 8500 required".into());
    assert!(matches!(err, ProviderError::Rejected { status: 400, .. }));

    let err = ProviderError::from_message("Web call failed with status 500.".into());
    assert!(matches!(err, ProviderError::Server { status: 500, .. }));

    let err = ProviderError::from_message("upstream (503) service unavailable".into());
    assert!(matches!(err, ProviderError::Server { status: 503, .. }));
}

#[test]
fn test_from_message_client_errors_not_retried() {
    for message in [
        "Request failed: status 404 Not Found",
        "HTTP 422 Unprocessable Entity",
        "Model not found: gemini-9.0-ultra",
        "invalid_request_error: temperature must be <= 2",
    ] {
        let err = ProviderError::from_message(message.into());
        assert_eq!(err.class(), ErrorClass::Fatal, "{message}");
    }

    assert!(matches!(
        ProviderError::from_message("status 404 Not Found".into()),
        ProviderError::Rejected { status: 404, .. }
    ));
    assert!(matches!(
        ProviderError::from_message("connection reset by peer".into()),
        ProviderError::Transport(_)
    ));
}

#[test]
fn test_backend_style_inference() {
    assert_eq!(BackendStyle::infer("gpt-3.5-turbo"), BackendStyle::Chat);
    assert_eq!(BackendStyle::infer("gpt-4-0613"), BackendStyle::Chat);
    assert_eq!(
        BackendStyle::infer("gpt-3.5-turbo-instruct"),
        BackendStyle::Completion
    );
    assert_eq!(BackendStyle::infer("text-davinci-003"), BackendStyle::Completion);
}

#[test]
fn test_shrink_factor() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.shrink(5400), 4320);
    assert_eq!(policy.shrink(1), 0);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_then_success_waits_backoff() {
    let backend = Arc::new(MockCompletionBackend::new(BackendStyle::Chat));
    backend.push_error(rate_limited());
    backend.push_error(rate_limited());
    backend.push_texts(["scored"]);

    let policy = RetryPolicy::default();
    let start = Instant::now();
    let text = client(backend.clone(), policy.clone())
        .complete("prompt")
        .await
        .unwrap();

    assert_eq!(text, "scored");
    let calls = backend.calls();
    assert_eq!(calls.len(), 3);
    for pair in calls.windows(2) {
        assert!(pair[1].at - pair[0].at >= policy.backoff);
    }
    assert!(start.elapsed() >= policy.backoff * 2);
}

#[tokio::test(start_paused = true)]
async fn test_context_overflow_shrinks_without_backoff() {
    let backend = Arc::new(MockCompletionBackend::new(BackendStyle::Chat));
    backend.push_error(overflow());
    backend.push_texts(["scored"]);

    let policy = RetryPolicy::default();
    let start = Instant::now();
    let text = client(backend.clone(), policy.clone())
        .complete("prompt")
        .await
        .unwrap();

    assert_eq!(text, "scored");
    let tokens: Vec<u32> = backend.calls().iter().map(|c| c.max_output_tokens).collect();
    assert_eq!(tokens, vec![5400, 4320]);
    assert!(start.elapsed() < policy.backoff);
}

#[tokio::test(start_paused = true)]
async fn test_overflow_does_not_consume_budget() {
    let backend = Arc::new(MockCompletionBackend::new(BackendStyle::Chat));
    backend.push_error(rate_limited());
    backend.push_error(overflow());
    backend.push_error(overflow());
    backend.push_texts(["ok"]);

    let text = client(backend.clone(), RetryPolicy::immediate(1))
        .complete("prompt")
        .await
        .unwrap();

    assert_eq!(text, "ok");
    assert_eq!(backend.call_count(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_retry_budget_exhausted() {
    let backend = Arc::new(MockCompletionBackend::responding(|_, _| {
        Err(ProviderError::Server {
            status: 502,
            message: "bad gateway".to_string(),
        })
    }));

    let err = client(backend.clone(), RetryPolicy::default())
        .complete("prompt")
        .await
        .unwrap_err();

    match err {
        CompletionError::RetriesExhausted { attempts, source } => {
            assert_eq!(attempts, 6);
            assert!(matches!(source, ProviderError::Server { status: 502, .. }));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(backend.call_count(), 6);
}

#[tokio::test(start_paused = true)]
async fn test_fatal_error_not_retried() {
    let backend = Arc::new(MockCompletionBackend::new(BackendStyle::Chat));
    backend.push_error(ProviderError::Rejected {
        status: 401,
        message: "Incorrect API key provided".to_string(),
    });

    let err = client(backend.clone(), RetryPolicy::default())
        .complete("prompt")
        .await
        .unwrap_err();

    assert!(matches!(err, CompletionError::Fatal(_)));
    assert_eq!(backend.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_context_unrecoverable_at_floor() {
    let backend = Arc::new(MockCompletionBackend::responding(|_, _| Err(overflow())));
    let client = CompletionClient::new(
        backend.clone(),
        DecodingConfig::default().with_max_output_tokens(2),
        RetryPolicy::immediate(5),
    );

    let err = client.complete("prompt").await.unwrap_err();

    assert!(matches!(
        err,
        CompletionError::ContextUnrecoverable {
            max_output_tokens: 1,
            ..
        }
    ));
    assert_eq!(backend.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_shrink_does_not_leak_between_requests() {
    let backend = Arc::new(MockCompletionBackend::new(BackendStyle::Chat));
    backend.push_error(overflow());
    backend.push_texts(["a"]);
    backend.push_texts(["b"]);

    let client = client(backend.clone(), RetryPolicy::immediate(0));
    let grouped = client
        .complete_many(&["one".to_string(), "two".to_string()])
        .await
        .unwrap();

    assert_eq!(grouped, vec![vec!["a".to_string()], vec!["b".to_string()]]);
    let tokens: Vec<u32> = backend.calls().iter().map(|c| c.max_output_tokens).collect();
    assert_eq!(tokens, vec![5400, 4320, 5400]);
    assert_eq!(client.decoding().max_output_tokens, 5400);
}

#[tokio::test(start_paused = true)]
async fn test_completion_style_groups_prompts() {
    let backend = Arc::new(MockCompletionBackend::new(BackendStyle::Completion));
    backend.push_texts(["a", "b"]);
    backend.push_texts(["c"]);

    let prompts: Vec<String> = ["p1", "p2", "p3"].iter().map(|s| s.to_string()).collect();
    let grouped = client(backend.clone(), RetryPolicy::immediate(0))
        .with_prompts_per_request(2)
        .complete_many(&prompts)
        .await
        .unwrap();

    assert_eq!(grouped.len(), 3);
    assert_eq!(grouped[2], vec!["c".to_string()]);
    let sizes: Vec<usize> = backend.calls().iter().map(|c| c.prompts.len()).collect();
    assert_eq!(sizes, vec![2, 1]);
}

#[tokio::test(start_paused = true)]
async fn test_multiple_completions_grouped_per_prompt() {
    let backend = Arc::new(MockCompletionBackend::new(BackendStyle::Chat));
    backend.push_texts(["first", "second"]);

    let client = CompletionClient::new(
        backend.clone(),
        DecodingConfig::default().with_num_completions(2),
        RetryPolicy::immediate(0),
    );

    let all = client.complete_all("prompt").await.unwrap();
    assert_eq!(all, vec!["first".to_string(), "second".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_unexpected_completion_count() {
    let backend = Arc::new(MockCompletionBackend::new(BackendStyle::Chat));
    backend.push_texts(Vec::<String>::new());

    let err = client(backend, RetryPolicy::immediate(0))
        .complete("prompt")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CompletionError::UnexpectedCompletionCount {
            expected: 1,
            actual: 0
        }
    ));
}

struct StallingBackend;

#[async_trait]
impl CompletionBackend for StallingBackend {
    fn name(&self) -> &str {
        "stalling"
    }

    fn style(&self) -> BackendStyle {
        BackendStyle::Chat
    }

    async fn complete(
        &self,
        _prompts: &[String],
        _config: &DecodingConfig,
    ) -> Result<Vec<String>, ProviderError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(vec!["late".to_string()])
    }
}

#[tokio::test(start_paused = true)]
async fn test_request_timeout_counts_as_transient() {
    let mut policy = RetryPolicy::immediate(1);
    policy.request_timeout = Some(Duration::from_secs(5));

    let client = CompletionClient::new(Arc::new(StallingBackend), DecodingConfig::default(), policy);
    let err = client.complete("prompt").await.unwrap_err();

    match err {
        CompletionError::RetriesExhausted { attempts, source } => {
            assert_eq!(attempts, 2);
            assert_eq!(source, ProviderError::Timeout);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_with_retry_reports_attempts_and_tokens() {
    let mut failures = 1;
    let retried = with_retry(
        &RetryPolicy::immediate(3),
        DecodingConfig::default(),
        |config| {
            let fail = failures > 0;
            failures -= 1;
            async move {
                if fail {
                    Err(overflow())
                } else {
                    Ok(config.max_output_tokens)
                }
            }
        },
    )
    .await
    .unwrap();

    assert_eq!(retried.attempts, 2);
    assert_eq!(retried.value, 4320);
    assert_eq!(retried.max_output_tokens, 4320);
}
