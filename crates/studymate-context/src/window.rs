//! Context window management

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::{ConversationTurn, TurnRole};

/// Default cap on the turns forwarded to a backend: 1 system + 19 prior + 1 current.
pub const DEFAULT_MAX_TURNS: usize = 21;

/// Context window configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct WindowPolicy {
    /// Maximum number of turns in the window, system and current turn included
    pub max_turns: usize,
}

impl Default for WindowPolicy {
    fn default() -> Self {
        Self {
            max_turns: DEFAULT_MAX_TURNS,
        }
    }
}

impl WindowPolicy {
    pub fn new(max_turns: usize) -> Self {
        Self { max_turns }
    }

    pub fn build(
        &self,
        system_prompt: &str,
        prior_turns: &[ConversationTurn],
        current_user_message: &str,
    ) -> ConversationWindow {
        build_window(
            system_prompt,
            prior_turns,
            current_user_message,
            self.max_turns,
        )
    }
}

/// Bounded, ordered turns ready to send to a model backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ConversationWindow {
    turns: Vec<ConversationTurn>,
}

impl ConversationWindow {
    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn into_turns(self) -> Vec<ConversationTurn> {
        self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConversationTurn> {
        self.turns.iter()
    }

    /// The leading system turn, if the window has one
    pub fn system_turn(&self) -> Option<&ConversationTurn> {
        self.turns.first().filter(|turn| turn.is_system())
    }

    /// The turn the backend is expected to answer
    pub fn current_turn(&self) -> Option<&ConversationTurn> {
        self.turns.last()
    }

    pub fn estimated_tokens(&self) -> usize {
        self.turns.iter().map(ConversationTurn::estimated_tokens).sum()
    }
}

/// Build the window `[system] + prior_turns + [current]`, dropping the oldest
/// prior turns until it fits in `max_turns`.
///
/// A leading system turn in `prior_turns` is never duplicated: it is discarded
/// when `system_prompt` is set and promoted to the system turn otherwise. Any
/// later system turn in history is kept as ordinary history under the user
/// role. The system and current turns are never dropped, so a cap smaller than
/// those anchors is raised to fit them.
pub fn build_window(
    system_prompt: &str,
    prior_turns: &[ConversationTurn],
    current_user_message: &str,
    max_turns: usize,
) -> ConversationWindow {
    let mut system = (!system_prompt.is_empty()).then(|| system_prompt.to_string());

    let mut history = Vec::with_capacity(prior_turns.len());
    for (index, turn) in prior_turns.iter().enumerate() {
        if !turn.is_system() {
            history.push(turn.clone());
            continue;
        }

        if index == 0 {
            if system.is_none() {
                system = Some(turn.content.clone());
            }
            continue;
        }

        history.push(ConversationTurn::new(TurnRole::User, turn.content.clone()));
    }

    let anchors = 1 + usize::from(system.is_some());
    let history_budget = max_turns.max(anchors) - anchors;
    let dropped = history.len().saturating_sub(history_budget);
    if dropped > 0 {
        debug!(
            dropped,
            kept = history_budget,
            max_turns,
            "trimming oldest turns from context window"
        );
    }

    let mut turns = Vec::with_capacity(anchors + history.len() - dropped);
    if let Some(content) = system {
        turns.push(ConversationTurn::system(content));
    }
    turns.extend(history.into_iter().skip(dropped));
    turns.push(ConversationTurn::user(current_user_message));

    ConversationWindow { turns }
}
