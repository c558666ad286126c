//! Studymate Assistant - tutoring chat and study material generation
//!
//! Ties the context window, the model backend and the structured-output
//! decoder together:
//! - chat with a bounded conversation window, optionally inside a session
//! - quiz generation (fails loudly on unrecoverable model output)
//! - flashcard generation normalized to the requested card count
//! - a per-request deadline on every backend call

pub mod assistant;
pub mod config;
pub mod error;
pub mod prompts;

pub use assistant::{placeholder_quiz, preview_window, ChatReply, StudyAssistant};
pub use config::AssistantConfig;
pub use error::{AssistantError, AssistantResult};
pub use prompts::{Difficulty, FlashcardRequest, QuizRequest};

/// Prelude for common imports
pub mod prelude {
    pub use crate::assistant::{ChatReply, StudyAssistant};
    pub use crate::config::AssistantConfig;
    pub use crate::error::{AssistantError, AssistantResult};
    pub use crate::prompts::{Difficulty, FlashcardRequest, QuizRequest};
}
