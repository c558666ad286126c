use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use studymate_context::estimate_tokens;
use studymate_runtime::{BackendError, ChatRequest, ChatResponse, ModelBackend};
use tracing::debug;

const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";
const CLIENT_TIMEOUT: Duration = Duration::from_secs(60);

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_SAMBANOVA_BASE_URL: &str = "https://api.sambanova.ai";
pub const DEFAULT_SAMBANOVA_MODEL: &str = "Meta-Llama-3.1-8B-Instruct";

/// Client for any endpoint speaking the OpenAI chat-completions protocol
#[derive(Debug, Clone)]
pub struct OpenAICompatibleBackend {
    name: &'static str,
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    json_mode: bool,
    timeout: Duration,
}

impl OpenAICompatibleBackend {
    pub fn new(
        name: &'static str,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            name,
            client: build_client(CLIENT_TIMEOUT),
            api_key: api_key.into(),
            base_url: base_url.into(),
            model: model.into(),
            json_mode: false,
            timeout: CLIENT_TIMEOUT,
        }
    }

    /// OpenAI's hosted API
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::new("openai", api_key, DEFAULT_OPENAI_BASE_URL, DEFAULT_OPENAI_MODEL)
            .with_json_mode(true)
    }

    /// SambaNova Cloud serving Llama models
    pub fn sambanova(api_key: impl Into<String>) -> Self {
        Self::new(
            "sambanova",
            api_key,
            DEFAULT_SAMBANOVA_BASE_URL,
            DEFAULT_SAMBANOVA_MODEL,
        )
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Send `response_format: json_object` for requests that expect JSON
    pub fn with_json_mode(mut self, enabled: bool) -> Self {
        self.json_mode = enabled;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = build_client(timeout);
        self.timeout = timeout;
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            CHAT_COMPLETIONS_PATH
        )
    }

    fn payload(&self, req: ChatRequest) -> ChatCompletionRequest {
        let response_format = (self.json_mode && req.json_output).then(|| ResponseFormat {
            format_type: "json_object",
        });

        ChatCompletionRequest {
            model: req.model.unwrap_or_else(|| self.model.clone()),
            messages: req
                .messages
                .into_iter()
                .map(|turn| WireMessage {
                    role: turn.role.as_str(),
                    content: turn.content,
                })
                .collect(),
            max_tokens: req.max_tokens,
            temperature: req.temperature,
            response_format,
            stream: false,
        }
    }

    fn transport_error(&self, err: &reqwest::Error) -> BackendError {
        if err.is_timeout() {
            BackendError::Timeout(self.timeout)
        } else {
            BackendError::Transport(err.to_string())
        }
    }

    async fn parse_error_response(status: StatusCode, response: reqwest::Response) -> BackendError {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unable to read body>".to_string());

        let parsed = serde_json::from_str::<ErrorEnvelope>(&body)
            .ok()
            .map_or_else(|| body.clone(), |err| err.error.message);

        BackendError::HttpStatus {
            status: status.as_u16(),
            body: parsed,
        }
    }
}

fn build_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

#[async_trait]
impl ModelBackend for OpenAICompatibleBackend {
    fn name(&self) -> &'static str {
        self.name
    }

    fn default_model(&self) -> &str {
        &self.model
    }

    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, BackendError> {
        let prompt_tokens: usize = req
            .messages
            .iter()
            .map(|turn| estimate_tokens(&turn.content))
            .sum();
        let payload = self.payload(req);

        debug!(
            backend = self.name,
            model = %payload.model,
            messages = payload.messages.len(),
            "sending chat completion request"
        );

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|err| self.transport_error(&err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::parse_error_response(status, response).await);
        }

        let body: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|err| BackendError::Decode(err.to_string()))?;

        let first_choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::Decode("missing choice in response".to_string()))?;
        let content = first_choice.message.content.unwrap_or_default();

        let tokens_used = body.usage.map_or_else(
            || {
                let estimate = prompt_tokens + estimate_tokens(&content);
                u32::try_from(estimate).unwrap_or(u32::MAX)
            },
            |usage| usage.total_tokens,
        );

        Ok(ChatResponse {
            content,
            tokens_used,
            model: Some(body.model),
            finish_reason: first_choice.finish_reason,
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    model: String,
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}
