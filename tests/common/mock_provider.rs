//! In-process OpenAI-compatible provider for HTTP-level tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Produces the completion text for one prompt.
pub type Responder = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// A scripted failure returned instead of a completion.
#[derive(Debug, Clone)]
pub struct ScriptedFailure {
    pub status: StatusCode,
    pub body: String,
}

impl ScriptedFailure {
    pub fn rate_limited() -> Self {
        Self::error(
            StatusCode::TOO_MANY_REQUESTS,
            "rate_limit_exceeded",
            "Rate limit reached for requests",
        )
    }

    pub fn context_length_exceeded() -> Self {
        Self::error(
            StatusCode::BAD_REQUEST,
            "context_length_exceeded",
            "This model's maximum context length is 4097 tokens. Please reduce your prompt; or completion length.",
        )
    }

    pub fn unauthorized() -> Self {
        Self::error(
            StatusCode::UNAUTHORIZED,
            "invalid_api_key",
            "Incorrect API key provided",
        )
    }

    pub fn server_error() -> Self {
        Self::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "server_error",
            "The server had an error while processing your request",
        )
    }

    /// 200 with a body that is not a completion response.
    pub fn malformed() -> Self {
        Self {
            status: StatusCode::OK,
            body: "<html>upstream gateway</html>".to_string(),
        }
    }

    fn error(status: StatusCode, code: &str, message: &str) -> Self {
        Self {
            status,
            body: json!({
                "error": { "message": message, "type": "invalid_request_error", "code": code }
            })
            .to_string(),
        }
    }
}

/// A request seen by the mock provider.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: &'static str,
    pub body: Value,
    pub headers: HeaderMap,
}

struct ProviderState {
    responder: Responder,
    failures: Mutex<VecDeque<ScriptedFailure>>,
    requests: Mutex<Vec<RecordedRequest>>,
    reverse_choices: bool,
}

pub struct MockProvider {
    pub addr: SocketAddr,
    state: Arc<ProviderState>,
    _server_handle: JoinHandle<()>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockProvider {
    pub async fn start(responder: Responder) -> Self {
        Self::start_with(responder, false).await
    }

    /// Like [`MockProvider::start`], but returns choices in reverse index order.
    pub async fn start_reversed(responder: Responder) -> Self {
        Self::start_with(responder, true).await
    }

    async fn start_with(responder: Responder, reverse_choices: bool) -> Self {
        let state = Arc::new(ProviderState {
            responder,
            failures: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            reverse_choices,
        });

        let app = Router::new()
            .route("/v1/chat/completions", post(chat_completions))
            .route("/v1/completions", post(completions))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let server_handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            state,
            _server_handle: server_handle,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}/v1", self.addr)
    }

    pub fn fail_next(&self, failure: ScriptedFailure) {
        self.state.failures.lock().push_back(failure);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().clone()
    }
}

impl Drop for MockProvider {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

fn record(
    state: &ProviderState,
    path: &'static str,
    headers: HeaderMap,
    body: &Value,
) -> Option<Response> {
    state.requests.lock().push(RecordedRequest {
        path,
        body: body.clone(),
        headers,
    });

    let failure = state.failures.lock().pop_front()?;
    Some((failure.status, failure.body).into_response())
}

fn completions_per_prompt(body: &Value) -> usize {
    body["n"].as_u64().unwrap_or(1).max(1) as usize
}

async fn chat_completions(
    State(state): State<Arc<ProviderState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Some(failure) = record(&state, "/v1/chat/completions", headers, &body) {
        return failure;
    }

    let prompt = body["messages"]
        .as_array()
        .and_then(|messages| messages.last())
        .and_then(|m| m["content"].as_str())
        .unwrap_or_default()
        .to_string();

    let mut choices: Vec<Value> = (0..completions_per_prompt(&body))
        .map(|i| {
            json!({
                "index": i,
                "message": { "role": "assistant", "content": (state.responder)(prompt.as_str()) },
                "finish_reason": "stop",
                "logprobs": null,
            })
        })
        .collect();
    if state.reverse_choices {
        choices.reverse();
    }

    Json(json!({
        "id": "chatcmpl-mock",
        "object": "chat.completion",
        "created": 1_700_000_000u32,
        "model": body["model"],
        "choices": choices,
        "usage": { "prompt_tokens": 10, "completion_tokens": 10, "total_tokens": 20 },
    }))
    .into_response()
}

async fn completions(
    State(state): State<Arc<ProviderState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Some(failure) = record(&state, "/v1/completions", headers, &body) {
        return failure;
    }

    let prompts: Vec<String> = match &body["prompt"] {
        Value::Array(items) => items
            .iter()
            .map(|p| p.as_str().unwrap_or_default().to_string())
            .collect(),
        Value::String(p) => vec![p.clone()],
        _ => Vec::new(),
    };
    let n = completions_per_prompt(&body);

    let mut choices: Vec<Value> = prompts
        .iter()
        .flat_map(|prompt| (0..n).map(move |_| prompt))
        .enumerate()
        .map(|(i, prompt)| {
            json!({
                "text": (state.responder)(prompt.as_str()),
                "index": i,
                "finish_reason": "stop",
                "logprobs": null,
            })
        })
        .collect();
    if state.reverse_choices {
        choices.reverse();
    }

    Json(json!({
        "id": "cmpl-mock",
        "object": "text_completion",
        "created": 1_700_000_000u32,
        "model": body["model"],
        "choices": choices,
    }))
    .into_response()
}

/// Titles rendered into a scoring prompt, in order.
pub fn prompt_titles(prompt: &str) -> Vec<String> {
    prompt
        .lines()
        .filter_map(|line| {
            let (number, rest) = line.split_once(". Title: ")?;
            number.parse::<usize>().ok()?;
            Some(rest.to_string())
        })
        .collect()
}

/// One JSON line per paper in the prompt, scored from `scores` (unknown titles get 0).
///
/// Any `extra` lines are appended to every response.
pub fn scoring_responder(scores: HashMap<String, u8>, extra: Vec<String>) -> Responder {
    Arc::new(move |prompt| {
        let mut lines: Vec<String> = prompt_titles(prompt)
            .iter()
            .enumerate()
            .map(|(i, title)| {
                let score = scores.get(title).copied().unwrap_or(0);
                format!(
                    "{}. {}",
                    i + 1,
                    json!({
                        "Title": title,
                        "Relevancy score": format!("{}/10", score),
                        "Reasons for match": format!("Scored {}", score),
                        "Goal": "Evaluate the method",
                        "Git": "N/A",
                    })
                )
            })
            .collect();
        lines.extend(extra.iter().cloned());
        lines.join("\n")
    })
}

/// Echoes a fixed text for every prompt.
pub fn fixed_responder(text: &str) -> Responder {
    let text = text.to_string();
    Arc::new(move |_| text.clone())
}
