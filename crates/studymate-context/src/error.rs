//! Error types for context management

use thiserror::Error;

/// Context management error type
#[derive(Error, Debug)]
pub enum ContextError {
    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Invalid turn: {0}")]
    InvalidTurn(String),
}

/// Result type for context operations
pub type ContextResult<T> = Result<T, ContextError>;
