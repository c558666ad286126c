use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use studymate_runtime::{BackendError, ModelBackend};
use tracing::{info, warn};

use crate::OpenAICompatibleBackend;

pub const BACKEND_ENV: &str = "STUDYMATE_BACKEND";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    OpenAI,
    SambaNova,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::OpenAI => "openai",
            BackendKind::SambaNova => "sambanova",
        }
    }

    pub fn api_key_env(self) -> &'static str {
        match self {
            BackendKind::OpenAI => "OPENAI_API_KEY",
            BackendKind::SambaNova => "SAMBANOVA_API_KEY",
        }
    }

    pub fn base_url_env(self) -> &'static str {
        match self {
            BackendKind::OpenAI => "OPENAI_API_BASE",
            BackendKind::SambaNova => "SAMBANOVA_API_BASE",
        }
    }

    pub fn model_env(self) -> &'static str {
        match self {
            BackendKind::OpenAI => "OPENAI_MODEL",
            BackendKind::SambaNova => "SAMBANOVA_MODEL",
        }
    }
}

impl FromStr for BackendKind {
    type Err = BackendError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(BackendKind::OpenAI),
            "sambanova" | "llama" => Ok(BackendKind::SambaNova),
            _ => Err(BackendError::Message(format!(
                "unsupported backend '{value}', expected one of: openai, sambanova"
            ))),
        }
    }
}

pub fn create_backend(kind: BackendKind, api_key: impl Into<String>) -> OpenAICompatibleBackend {
    match kind {
        BackendKind::OpenAI => OpenAICompatibleBackend::openai(api_key),
        BackendKind::SambaNova => OpenAICompatibleBackend::sambanova(api_key),
    }
}

/// Backend selection and credentials, read from the environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendSettings {
    pub kind: BackendKind,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub timeout: Option<Duration>,
}

impl BackendSettings {
    pub fn new(kind: BackendKind) -> Self {
        Self {
            kind,
            api_key: None,
            base_url: None,
            model: None,
            timeout: None,
        }
    }

    pub fn from_env() -> Result<Self, BackendError> {
        let kind = match std::env::var(BACKEND_ENV) {
            Ok(name) => BackendKind::from_str(&name)?,
            Err(_) => BackendKind::OpenAI,
        };

        Ok(Self {
            kind,
            api_key: non_empty_env(kind.api_key_env()),
            base_url: non_empty_env(kind.base_url_env()),
            model: non_empty_env(kind.model_env()),
            timeout: None,
        })
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the configured backend, or `None` when no API key is set
    pub fn into_backend(self) -> Option<Arc<dyn ModelBackend>> {
        let Some(api_key) = self.api_key else {
            warn!(
                backend = self.kind.as_str(),
                env = self.kind.api_key_env(),
                "no API key configured, running without a model backend"
            );
            return None;
        };

        let mut backend = create_backend(self.kind, api_key);
        if let Some(base_url) = self.base_url {
            backend = backend.with_base_url(base_url);
        }
        if let Some(model) = self.model {
            backend = backend.with_model(model);
        }
        if let Some(timeout) = self.timeout {
            backend = backend.with_timeout(timeout);
        }

        info!(
            backend = self.kind.as_str(),
            model = backend.default_model(),
            "model backend configured"
        );
        Some(Arc::new(backend))
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
