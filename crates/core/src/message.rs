//! Message domain types.
//!
//! Messages are the value objects that flow through a chat turn:
//! user types input → store appends it → trimmer selects history →
//! provider generates the reply → store appends the reply.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions (persona, output language)
    System,
    /// The end user
    User,
    /// The model
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a message's approximate size is measured.
///
/// The trimmer compares these sizes against its budget, so the metric and
/// the budget must be expressed in the same unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeMetric {
    /// Whitespace-separated words.
    #[default]
    Words,
    /// BPE-ish token estimate: 1 token ≈ 4 characters, rounded up.
    Tokens,
}

impl SizeMetric {
    /// Measure `text` in this metric's unit.
    pub fn measure(&self, text: &str) -> usize {
        match self {
            SizeMetric::Words => text.split_whitespace().count(),
            SizeMetric::Tokens => text.len().div_ceil(4),
        }
    }
}

/// A single message in a conversation.
///
/// Fields are private: a message is immutable once created, and its
/// `approx_size` is fixed at construction time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    id: String,
    role: Role,
    content: String,
    approx_size: usize,
    timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a message, measuring its size with `metric`.
    pub fn new(role: Role, content: impl Into<String>, metric: SizeMetric) -> Self {
        let content = content.into();
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            approx_size: metric.measure(&content),
            content,
            timestamp: Utc::now(),
        }
    }

    /// Create a new user message (word-count sizing).
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content, SizeMetric::Words)
    }

    /// Create a new assistant message (word-count sizing).
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content, SizeMetric::Words)
    }

    /// Create a new system message (word-count sizing).
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content, SizeMetric::Words)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Size proxy used by the trimmer.
    pub fn approx_size(&self) -> usize {
        self.approx_size
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn is_system(&self) -> bool {
        self.role == Role::System
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_user_message() {
        let msg = Message::user("Hello, GemmaBot!");
        assert_eq!(msg.role(), Role::User);
        assert_eq!(msg.content(), "Hello, GemmaBot!");
        assert_eq!(msg.approx_size(), 2);
    }

    #[test]
    fn word_metric_ignores_extra_whitespace() {
        assert_eq!(SizeMetric::Words.measure("  one   two\tthree\n"), 3);
        assert_eq!(SizeMetric::Words.measure(""), 0);
    }

    #[test]
    fn token_metric_rounds_up() {
        assert_eq!(SizeMetric::Tokens.measure(""), 0);
        assert_eq!(SizeMetric::Tokens.measure("test"), 1);
        assert_eq!(SizeMetric::Tokens.measure("hello"), 2);
        assert_eq!(SizeMetric::Tokens.measure(&"a".repeat(100)), 25);
    }

    #[test]
    fn size_is_fixed_by_metric_at_construction() {
        let msg = Message::new(Role::Assistant, "abcdefgh ijkl", SizeMetric::Tokens);
        assert_eq!(msg.approx_size(), 4);
    }

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&Role::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");
        assert_eq!(Role::System.to_string(), "system");
    }

    #[test]
    fn message_ids_are_unique() {
        let a = Message::user("same");
        let b = Message::user("same");
        assert_ne!(a.id(), b.id());
    }
}
