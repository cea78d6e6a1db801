//! Short-term conversational memory for LingoChat.
//!
//! - [`MessageStore`]: the append-only log of one session's messages
//! - [`Trimmer`]: selects the part of that log that fits a size budget
//!   before each model call

pub mod store;
pub mod trim;

pub use store::MessageStore;
pub use trim::{Trimmer, trim};
