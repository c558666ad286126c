//! In-memory session manager

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::context::ConversationTurn;
use crate::error::{ContextError, ContextResult};
use crate::session::StudySession;

/// Keeps study sessions in memory, keyed by session id
#[derive(Debug, Clone, Default)]
pub struct SessionManager {
    sessions: Arc<RwLock<HashMap<Uuid, StudySession>>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new session
    pub async fn create_session(&self, subject: Option<String>) -> Uuid {
        let session = StudySession::new(subject);
        let id = session.id;
        self.sessions.write().await.insert(id, session);
        debug!(session_id = %id, "created study session");
        id
    }

    /// Get a session by ID
    pub async fn get_session(&self, id: Uuid) -> ContextResult<StudySession> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| ContextError::NotFound(id.to_string()))
    }

    /// Full turn history of a session
    pub async fn history(&self, id: Uuid) -> ContextResult<Vec<ConversationTurn>> {
        Ok(self.get_session(id).await?.turns)
    }

    /// Append turns to a session in order
    pub async fn append_turns(
        &self,
        id: Uuid,
        turns: impl IntoIterator<Item = ConversationTurn>,
    ) -> ContextResult<()> {
        let turns: Vec<ConversationTurn> = turns.into_iter().collect();
        if let Some(empty) = turns.iter().find(|turn| turn.content.trim().is_empty()) {
            return Err(ContextError::InvalidTurn(format!(
                "empty {} turn",
                empty.role.as_str()
            )));
        }

        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&id)
            .ok_or_else(|| ContextError::NotFound(id.to_string()))?;
        for turn in turns {
            session.push(turn);
        }

        Ok(())
    }

    /// Delete a session
    pub async fn delete_session(&self, id: Uuid) -> ContextResult<()> {
        self.sessions
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| ContextError::NotFound(id.to_string()))
    }
}
