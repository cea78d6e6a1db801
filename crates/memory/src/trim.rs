//! History trimming.
//!
//! Before every model call the session history is cut down to fit a size
//! budget. The rules, in order:
//!
//! 1. A leading `system` message is pinned when it fits the budget: its size
//!    is reserved first and the rest of the budget is filled newest → oldest.
//! 2. Filling stops at the first message that would overflow; everything
//!    older is dropped, so the kept history is a contiguous suffix.
//! 3. If the newest message cannot fit next to the pinned system message,
//!    the pin is released and only the suffix is kept.
//! 4. If the newest message alone is larger than the budget, it is kept
//!    alone. Messages are never split.

use lingochat_core::error::{Error, Result};
use lingochat_core::message::{Message, Role};
use tracing::debug;

/// Trim `messages` to `budget` with the default options.
///
/// `budget` must be positive; zero is a configuration error.
pub fn trim(messages: &[Message], budget: usize) -> Result<Vec<Message>> {
    Ok(Trimmer::new(budget)?.trim(messages))
}

/// A configured trimmer. Stateless; build once per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trimmer {
    budget: usize,
    start_on_user: bool,
}

impl Trimmer {
    pub fn new(budget: usize) -> Result<Self> {
        if budget == 0 {
            return Err(Error::config("trim budget must be a positive integer"));
        }
        Ok(Self {
            budget,
            start_on_user: false,
        })
    }

    /// Drop leading non-user messages from the kept suffix, so the history the
    /// model sees opens with a user turn. The newest message is always kept.
    pub fn with_start_on_user(mut self, enabled: bool) -> Self {
        self.start_on_user = enabled;
        self
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    /// Select the messages to send, in their original order.
    ///
    /// Returns an empty vector only for empty input.
    pub fn trim(&self, messages: &[Message]) -> Vec<Message> {
        let Some(newest) = messages.last() else {
            return Vec::new();
        };

        if let Some((system, rest)) = messages.split_first()
            && system.is_system()
            && !rest.is_empty()
            && system.approx_size() <= self.budget
        {
            let start = self.suffix_start(rest, self.budget - system.approx_size());
            if start < rest.len() {
                let mut kept = Vec::with_capacity(1 + rest.len() - start);
                kept.push(system.clone());
                kept.extend_from_slice(&rest[start..]);
                self.log(messages.len(), &kept);
                return kept;
            }
        }

        let start = self.suffix_start(messages, self.budget);
        let kept = if start < messages.len() {
            messages[start..].to_vec()
        } else {
            vec![newest.clone()]
        };
        self.log(messages.len(), &kept);
        kept
    }

    /// Index where the longest fitting suffix of `messages` begins.
    /// Equals `messages.len()` when not even the newest message fits.
    fn suffix_start(&self, messages: &[Message], budget: usize) -> usize {
        let mut used = 0;
        let mut start = messages.len();

        for (i, msg) in messages.iter().enumerate().rev() {
            if used + msg.approx_size() > budget {
                break;
            }
            used += msg.approx_size();
            start = i;
        }

        if self.start_on_user {
            while start + 1 < messages.len() && messages[start].role() != Role::User {
                start += 1;
            }
        }
        start
    }

    fn log(&self, total: usize, kept: &[Message]) {
        let size: usize = kept.iter().map(Message::approx_size).sum();
        debug!(
            total,
            kept = kept.len(),
            dropped = total - kept.len(),
            size,
            budget = self.budget,
            "History trimmed"
        );
    }
}
