//! Study session history

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::ConversationTurn;

/// A running study conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudySession {
    pub id: Uuid,
    /// Subject the learner is studying, if known
    pub subject: Option<String>,
    pub turns: Vec<ConversationTurn>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StudySession {
    pub fn new(subject: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            subject,
            turns: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn push(&mut self, turn: ConversationTurn) {
        self.turns.push(turn);
        self.updated_at = Utc::now();
    }

    /// Plain-text transcript of the non-system turns, oldest first
    pub fn transcript(&self) -> String {
        self.turns
            .iter()
            .filter(|turn| !turn.is_system())
            .map(|turn| format!("{}: {}", turn.role.as_str(), turn.content))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcript_skips_system_turns() {
        let mut session = StudySession::new(Some("biology".to_string()));
        session.push(ConversationTurn::system("tutor"));
        session.push(ConversationTurn::user("what is osmosis?"));
        session.push(ConversationTurn::assistant("water moving across a membrane"));

        assert_eq!(
            session.transcript(),
            "user: what is osmosis?\nassistant: water moving across a membrane"
        );
        assert!(session.updated_at >= session.created_at);
    }
}
