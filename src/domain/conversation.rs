// ============================================================
// Layer 3 — Conversation History
// ============================================================
// The only state the dialogue loop keeps between turns: an
// ordered, append-only list of what the user typed and what
// the model answered.
//
// Every turn the whole history is flattened into one context
// string (turns joined by newlines) and handed to the model
// together with the new input. Nothing is ever removed, so the
// context grows for as long as the session runs. Any window
// needed to fit a model's input limit is applied at encoding
// time by the model wrapper, never here.
//
// Reference: Rust Book §8 (Vectors)

use serde::{Deserialize, Serialize};

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Speaker {
    User,
    Model,
}

/// One line of the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: Speaker,
    pub text:    String,
}

/// Append-only record of every turn in call order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationHistory {
    pub turns: Vec<Turn>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record what the user typed
    pub fn push_user(&mut self, text: impl Into<String>) {
        self.turns.push(Turn { speaker: Speaker::User, text: text.into() });
    }

    /// Record what the model answered
    pub fn push_model(&mut self, text: impl Into<String>) {
        self.turns.push(Turn { speaker: Speaker::Model, text: text.into() });
    }

    /// All prior turns joined with `\n`, oldest first.
    /// Empty string before the first exchange.
    pub fn context(&self) -> String {
        self.turns
            .iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Number of completed user/model exchanges
    pub fn exchanges(&self) -> usize {
        self.turns.len() / 2
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_history_has_empty_context() {
        let h = ConversationHistory::new();
        assert!(h.turns.is_empty());
        assert_eq!(h.context(), "");
    }

    #[test]
    fn test_context_joins_with_newlines() {
        let mut h = ConversationHistory::new();
        h.push_user("hello");
        h.push_model("hi there");
        h.push_user("how are you?");
        assert_eq!(h.context(), "hello\nhi there\nhow are you?");
    }

    #[test]
    fn test_turns_keep_call_order() {
        let mut h = ConversationHistory::new();
        h.push_user("a");
        h.push_model("b");
        assert_eq!(h.turns[0].speaker, Speaker::User);
        assert_eq!(h.turns[1].speaker, Speaker::Model);
        assert_eq!(h.exchanges(), 1);
    }
}
