//! Session identifiers.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a chat session, e.g. `chat_1a2b3c4d`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh id: `chat_` followed by 8 lowercase hex characters.
    pub fn new() -> Self {
        let hex = Uuid::new_v4().simple().to_string();
        Self(format!("chat_{}", &hex[..8]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
