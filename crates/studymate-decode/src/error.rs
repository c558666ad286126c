//! Error types for structured-output decoding

use thiserror::Error;

/// Decoding error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// No JSON object could be recovered from the model output
    #[error("invalid-json: {0}")]
    InvalidJson(String),
}

impl DecodeError {
    /// Stable machine-readable reason
    pub fn reason(&self) -> &'static str {
        match self {
            DecodeError::InvalidJson(_) => "invalid-json",
        }
    }
}

/// Result type for decoding operations
pub type DecodeResult<T> = Result<T, DecodeError>;
