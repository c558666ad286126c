//! Studymate Context Management - turns, context windowing and session history
//!
//! This crate provides:
//! - Conversation turn types
//! - Turn-capped context window building
//! - In-memory study session history

pub mod context;
pub mod error;
pub mod manager;
pub mod session;
pub mod window;

pub use context::{estimate_tokens, ConversationTurn, TurnRole};
pub use error::{ContextError, ContextResult};
pub use manager::SessionManager;
pub use session::StudySession;
pub use window::{build_window, ConversationWindow, WindowPolicy, DEFAULT_MAX_TURNS};

/// Prelude for common imports
pub mod prelude {
    pub use crate::context::{ConversationTurn, TurnRole};
    pub use crate::error::{ContextError, ContextResult};
    pub use crate::manager::SessionManager;
    pub use crate::window::{build_window, ConversationWindow, WindowPolicy};
}
