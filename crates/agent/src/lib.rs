//! The conversation side of LingoChat.
//!
//! A [`ChatSession`] owns one conversation. For every user turn it:
//!
//! 1. **Records** the user message in the session memory
//! 2. **Trims** the history to the configured budget
//! 3. **Assembles** the prompt with the language instruction in front
//! 4. **Calls** the model through the configured [`Provider`](lingochat_core::Provider)
//! 5. **Records** the reply, or moves to the error state if the call failed
//!
//! The phrase "forget everything" short-circuits the turn and wipes memory.

pub mod assembler;
pub mod session;
pub mod settings;

#[cfg(test)]
mod test_helpers;

pub use assembler::{Prompt, PromptAssembler};
pub use session::{
    ChatSession, EntryKind, FORGET_COMMAND, FORGET_NOTICE, TranscriptEntry, TurnOutcome,
    TurnState, UPSTREAM_FAILURE_NOTICE, is_forget_command,
};
pub use settings::SessionSettings;
