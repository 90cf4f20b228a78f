use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use super::backend::CompletionBackend;
use super::config::{BackendStyle, DecodingConfig};
use super::error::ProviderError;

/// One scripted reply of [`MockCompletionBackend`].
#[derive(Debug, Clone)]
pub enum MockReply {
    Texts(Vec<String>),
    Error(ProviderError),
}

/// A request observed by [`MockCompletionBackend`].
#[derive(Debug, Clone)]
pub struct MockCall {
    pub prompts: Vec<String>,
    pub max_output_tokens: u32,
    pub at: Instant,
}

type Responder = dyn Fn(&[String], &DecodingConfig) -> Result<Vec<String>, ProviderError> + Send + Sync;

/// Scripted backend: replays queued replies in order, then falls back to the responder.
pub struct MockCompletionBackend {
    style: BackendStyle,
    script: Mutex<VecDeque<MockReply>>,
    responder: Option<Arc<Responder>>,
    calls: Mutex<Vec<MockCall>>,
}

impl MockCompletionBackend {
    pub fn new(style: BackendStyle) -> Self {
        Self {
            style,
            script: Mutex::new(VecDeque::new()),
            responder: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Chat-style mock answering every prompt through `responder`.
    pub fn responding<F>(responder: F) -> Self
    where
        F: Fn(&[String], &DecodingConfig) -> Result<Vec<String>, ProviderError>
            + Send
            + Sync
            + 'static,
    {
        Self::new(BackendStyle::Chat).with_responder(responder)
    }

    pub fn with_responder<F>(mut self, responder: F) -> Self
    where
        F: Fn(&[String], &DecodingConfig) -> Result<Vec<String>, ProviderError>
            + Send
            + Sync
            + 'static,
    {
        self.responder = Some(Arc::new(responder));
        self
    }

    pub fn push_texts<I, S>(&self, texts: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.script
            .lock()
            .push_back(MockReply::Texts(texts.into_iter().map(Into::into).collect()));
    }

    pub fn push_error(&self, error: ProviderError) {
        self.script.lock().push_back(MockReply::Error(error));
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl CompletionBackend for MockCompletionBackend {
    fn name(&self) -> &str {
        "mock"
    }

    fn style(&self) -> BackendStyle {
        self.style
    }

    async fn complete(
        &self,
        prompts: &[String],
        config: &DecodingConfig,
    ) -> Result<Vec<String>, ProviderError> {
        self.calls.lock().push(MockCall {
            prompts: prompts.to_vec(),
            max_output_tokens: config.max_output_tokens,
            at: Instant::now(),
        });

        let scripted = self.script.lock().pop_front();
        match scripted {
            Some(MockReply::Texts(texts)) => Ok(texts),
            Some(MockReply::Error(err)) => Err(err),
            None => match &self.responder {
                Some(responder) => responder(prompts, config),
                None => Err(ProviderError::Rejected {
                    status: 0,
                    message: "mock script exhausted".to_string(),
                }),
            },
        }
    }
}
