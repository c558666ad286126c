//! Error types for the study assistant

use std::time::Duration;

use studymate_context::ContextError;
use studymate_decode::DecodeError;
use studymate_runtime::BackendError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("no model backend configured")]
    BackendUnavailable,

    #[error("model backend did not answer within {0:?}")]
    BackendTimeout(Duration),

    #[error("model backend failed: {0}")]
    Backend(#[from] BackendError),

    #[error("model backend returned an empty reply")]
    EmptyReply,

    #[error("failed to generate quiz: {0}")]
    QuizDecode(#[from] DecodeError),

    #[error("failed to generate quiz: no usable questions in model output")]
    EmptyQuiz,

    #[error("session {0} has no conversation to build flashcards from")]
    EmptySession(Uuid),

    #[error("session error: {0}")]
    Session(#[from] ContextError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type AssistantResult<T> = Result<T, AssistantError>;
