//! In-memory message store for a single session.
//!
//! Nothing here is persisted: the store lives as long as its session.

use lingochat_core::error::{Error, Result};
use lingochat_core::message::Message;

/// An ordered, append-only log of role-tagged messages.
///
/// Messages are never edited in place. The only mutations are appending one
/// message and clearing the whole log.
#[derive(Debug, Clone, Default)]
pub struct MessageStore {
    messages: Vec<Message>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message to the end of the log.
    ///
    /// Fails with [`Error::Validation`] if the content is empty or
    /// whitespace-only; the log is left untouched in that case.
    pub fn append(&mut self, message: Message) -> Result<()> {
        if message.content().trim().is_empty() {
            return Err(Error::validation(format!(
                "{} message content must not be empty",
                message.role()
            )));
        }
        self.messages.push(message);
        Ok(())
    }

    /// Remove every message. Idempotent.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// An owned copy of the log, oldest first.
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }

    /// Borrow the log without copying.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Sum of `approx_size` over all stored messages.
    pub fn total_size(&self) -> usize {
        self.messages.iter().map(Message::approx_size).sum()
    }
}
