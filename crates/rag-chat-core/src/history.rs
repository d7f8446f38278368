//! Append-only conversation log.

use crate::models::ConversationTurn;

/// Default number of recent turns fed back into the prompt.
pub const DEFAULT_HISTORY_TURNS: usize = 6;

/// In-memory record of the chat, oldest turn first.
///
/// The store keeps every turn for the lifetime of the session; bounding
/// happens on read via [`ConversationStore::recent`].
#[derive(Debug, Default, Clone)]
pub struct ConversationStore {
    turns: Vec<ConversationTurn>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.turns.push(ConversationTurn {
            question: question.into(),
            answer: answer.into(),
        });
    }

    /// The last `n` turns in chronological order (fewer if the log is shorter).
    pub fn recent(&self, n: usize) -> &[ConversationTurn] {
        let start = self.turns.len().saturating_sub(n);
        &self.turns[start..]
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
