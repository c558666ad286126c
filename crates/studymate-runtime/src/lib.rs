//! Runtime abstractions for model backends.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use studymate_context::{ConversationTurn, ConversationWindow};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ConversationTurn>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    /// Ask the backend for a JSON object response when it supports it
    pub json_output: bool,
}

impl ChatRequest {
    pub fn new(window: ConversationWindow) -> Self {
        Self {
            messages: window.into_turns(),
            model: None,
            max_tokens: None,
            temperature: None,
            json_output: false,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature.clamp(0.0, 2.0));
        self
    }

    pub fn expect_json(mut self) -> Self {
        self.json_output = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub content: String,
    /// Total tokens billed for the exchange, or an estimate when the backend omits usage
    pub tokens_used: u32,
    pub model: Option<String>,
    pub finish_reason: Option<String>,
}

impl ChatResponse {
    pub fn text(content: impl Into<String>) -> Self {
        let content = content.into();
        let tokens_used =
            u32::try_from(studymate_context::estimate_tokens(&content)).unwrap_or(u32::MAX);
        Self {
            content,
            tokens_used,
            model: None,
            finish_reason: Some("stop".to_string()),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("scripted backend has no queued response")]
    ScriptExhausted,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("http status {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("response decode error: {0}")]
    Decode(String),
    #[error("backend error: {0}")]
    Message(String),
}

#[async_trait]
pub trait ModelBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Model used when a request does not name one
    fn default_model(&self) -> &str;

    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, BackendError>;
}

/// Backend that replays queued results, for tests and offline runs
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Result<ChatResponse, BackendError>>>,
    received: Mutex<Vec<ChatRequest>>,
    delay: Option<Duration>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait this long before answering each request
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn enqueue(&self, result: Result<ChatResponse, BackendError>) {
        self.replies
            .lock()
            .expect("scripted reply queue poisoned")
            .push_back(result);
    }

    pub fn enqueue_text(&self, content: impl Into<String>) {
        self.enqueue(Ok(ChatResponse::text(content)));
    }

    /// Requests received so far, oldest first
    pub fn received(&self) -> Vec<ChatRequest> {
        self.received
            .lock()
            .expect("scripted request log poisoned")
            .clone()
    }
}

#[async_trait]
impl ModelBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn default_model(&self) -> &str {
        "scripted-1"
    }

    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, BackendError> {
        self.received
            .lock()
            .expect("scripted request log poisoned")
            .push(req);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.replies
            .lock()
            .expect("scripted reply queue poisoned")
            .pop_front()
            .unwrap_or(Err(BackendError::ScriptExhausted))
    }
}
