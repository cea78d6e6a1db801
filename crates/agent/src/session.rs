//! The session controller: one chat conversation and its turn state machine.
//!
//! ```text
//!            submit(text)                 reply
//!   Idle ─────────────────▶ AwaitingReply ──────▶ Idle
//!    ▲  ╲                        │
//!    │   ╲ "forget everything"   │ upstream error
//!    │    ╲──▶ (clear) Idle      ▼
//!    └──────── submit(text) ── Error
//! ```
//!
//! `reset()` ("new chat") is accepted in every state and returns to `Idle`
//! with an empty memory and a fresh session id.

use chrono::{DateTime, Utc};
use lingochat_core::error::{Error, Result};
use lingochat_core::language::Language;
use lingochat_core::message::{Message, Role};
use lingochat_core::provider::{Provider, Usage};
use lingochat_core::session::SessionId;
use lingochat_memory::MessageStore;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::settings::SessionSettings;

/// The phrase that wipes the session memory when it appears in user input.
pub const FORGET_COMMAND: &str = "forget everything";

/// Shown after the memory has been wiped by [`FORGET_COMMAND`].
pub const FORGET_NOTICE: &str =
    "My memory has been completely wiped for this session. What's your name again?";

/// Shown when the model call fails.
pub const UPSTREAM_FAILURE_NOTICE: &str =
    "An error occurred. Please try again or check the API key.";

/// Turn-level state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    Idle,
    AwaitingReply,
    Error,
}

impl TurnState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnState::Idle => "idle",
            TurnState::AwaitingReply => "awaiting_reply",
            TurnState::Error => "error",
        }
    }
}

/// What a single `submit` produced, for the UI to render.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TurnOutcome {
    /// The model answered; the reply is now in memory.
    Reply {
        content: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        usage: Option<Usage>,
    },
    /// The forget command cleared the memory. No model call was made.
    MemoryWiped { notice: String },
    /// The model call failed. The user message stays in memory, no reply was
    /// recorded.
    Failed { notice: String, detail: String },
}

/// What a transcript line represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Greeting,
    Message,
    Notice,
    Error,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Greeting => "greeting",
            EntryKind::Message => "message",
            EntryKind::Notice => "notice",
            EntryKind::Error => "error",
        }
    }
}

/// One line of the display transcript. This is UI history, not model memory.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptEntry {
    pub role: Role,
    pub text: String,
    pub kind: EntryKind,
}

impl TranscriptEntry {
    fn new(role: Role, text: impl Into<String>, kind: EntryKind) -> Self {
        Self {
            role,
            text: text.into(),
            kind,
        }
    }
}

/// True if the whole of `input` is the forget command, ignoring case and
/// runs of whitespace. A sentence that only mentions it does not count.
pub fn is_forget_command(input: &str) -> bool {
    let normalized = input
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    normalized == FORGET_COMMAND
}

/// One live conversation: its memory, output language, transcript and
/// turn state. Each session is an independent context object.
pub struct ChatSession {
    id: SessionId,
    language: Language,
    memory: MessageStore,
    transcript: Vec<TranscriptEntry>,
    state: TurnState,
    provider: Arc<dyn Provider>,
    settings: Arc<SessionSettings>,
    last_active: DateTime<Utc>,
}

impl ChatSession {
    /// Start a session in the configured default language.
    pub fn new(provider: Arc<dyn Provider>, settings: Arc<SessionSettings>) -> Self {
        let language = settings.default_language.clone();
        let mut session = Self {
            id: SessionId::new(),
            language,
            memory: MessageStore::new(),
            transcript: Vec::new(),
            state: TurnState::Idle,
            provider,
            settings,
            last_active: Utc::now(),
        };
        session.push_greeting();
        session
    }

    /// Start a session in `language` (validated against the supported set).
    pub fn with_language(
        provider: Arc<dyn Provider>,
        settings: Arc<SessionSettings>,
        language: &str,
    ) -> Result<Self> {
        let language = settings.languages().resolve(language)?;
        let mut session = Self::new(provider, settings);
        session.language = language;
        session.transcript.clear();
        session.push_greeting();
        Ok(session)
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn language(&self) -> &Language {
        &self.language
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    /// The model memory (what gets trimmed and sent).
    pub fn memory(&self) -> &MessageStore {
        &self.memory
    }

    /// The display transcript (what the UI shows).
    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    pub fn last_active(&self) -> DateTime<Utc> {
        self.last_active
    }

    /// The welcome line shown at the top of every new chat.
    pub fn greeting(&self) -> String {
        format!(
            "Hello! I'm {}. I will respond in **{}**. Ask me anything!",
            self.settings.bot_name(),
            self.language
        )
    }

    /// Process one user turn.
    ///
    /// A turn is refused with [`Error::TurnInProgress`] while a reply is
    /// pending, except for the forget command. Validation problems are returned as errors and leave the session
    /// untouched. A failing model call is not an error: it is reported as
    /// [`TurnOutcome::Failed`] and moves the session to [`TurnState::Error`].
    pub async fn submit(&mut self, input: &str) -> Result<TurnOutcome> {
        let text = input.trim();
        if text.is_empty() {
            return Err(Error::validation("message must not be empty"));
        }

        // The forget command is honoured in every state.
        if is_forget_command(text) {
            self.last_active = Utc::now();
            self.memory.clear();
            self.state = TurnState::Idle;
            self.transcript
                .push(TranscriptEntry::new(Role::User, text, EntryKind::Message));
            self.transcript.push(TranscriptEntry::new(
                Role::Assistant,
                FORGET_NOTICE,
                EntryKind::Notice,
            ));
            info!(session = %self.id, "Memory wiped by user command");
            return Ok(TurnOutcome::MemoryWiped {
                notice: FORGET_NOTICE.to_string(),
            });
        }

        if self.state == TurnState::AwaitingReply {
            return Err(Error::TurnInProgress);
        }
        self.last_active = Utc::now();

        let user_message = Message::new(Role::User, text, self.settings.size_metric);

        // Build the whole request before touching memory, so a validation
        // failure cannot leave a half-written turn behind.
        let mut history = self.memory.snapshot();
        history.push(user_message.clone());
        let trimmed = self.settings.trimmer.trim(&history);
        let prompt = self
            .settings
            .assembler
            .assemble(trimmed, self.language.as_str())?;
        let request = prompt.into_request(
            &self.settings.model,
            self.settings.temperature,
            self.settings.max_tokens,
        );

        self.memory.append(user_message)?;
        self.transcript
            .push(TranscriptEntry::new(Role::User, text, EntryKind::Message));
        self.state = TurnState::AwaitingReply;

        debug!(
            session = %self.id,
            language = %self.language,
            sent = request.messages.len(),
            stored = self.memory.len(),
            "Awaiting model reply"
        );

        let provider = Arc::clone(&self.provider);
        let result = provider
            .complete(request)
            .await
            .map_err(Error::from)
            .and_then(|response| {
                if response.content.trim().is_empty() {
                    Err(Error::Upstream("model returned an empty reply".into()))
                } else {
                    Ok(response)
                }
            });

        match result {
            Ok(response) => {
                let reply = Message::new(
                    Role::Assistant,
                    response.content.clone(),
                    self.settings.size_metric,
                );
                self.memory.append(reply)?;
                self.transcript.push(TranscriptEntry::new(
                    Role::Assistant,
                    &response.content,
                    EntryKind::Message,
                ));
                self.state = TurnState::Idle;
                debug!(session = %self.id, model = %response.model, "Reply recorded");
                Ok(TurnOutcome::Reply {
                    content: response.content,
                    usage: response.usage,
                })
            }
            Err(err) => {
                warn!(session = %self.id, provider = self.provider.name(), error = %err, "Model call failed");
                let detail = err.to_string();
                self.transcript.push(TranscriptEntry::new(
                    Role::Assistant,
                    UPSTREAM_FAILURE_NOTICE,
                    EntryKind::Error,
                ));
                self.state = TurnState::Error;
                Ok(TurnOutcome::Failed {
                    notice: UPSTREAM_FAILURE_NOTICE.to_string(),
                    detail,
                })
            }
        }
    }

    /// Start a new chat: clear memory and transcript, issue a new id and
    /// return to `Idle`. Valid in every state.
    pub fn reset(&mut self) {
        let previous = std::mem::replace(&mut self.id, SessionId::new());
        self.memory.clear();
        self.transcript.clear();
        self.state = TurnState::Idle;
        self.last_active = Utc::now();
        self.push_greeting();
        info!(previous = %previous, session = %self.id, "New chat started");
    }

    /// Switch the output language. A different language starts a new chat;
    /// the same language is a no-op. Returns whether anything changed.
    pub fn set_language(&mut self, language: &str) -> Result<bool> {
        let language = self.settings.languages().resolve(language)?;
        if language == self.language {
            return Ok(false);
        }
        info!(session = %self.id, from = %self.language, to = %language, "Output language changed");
        self.language = language;
        self.reset();
        Ok(true)
    }

    fn push_greeting(&mut self) {
        let greeting = self.greeting();
        self.transcript.push(TranscriptEntry::new(
            Role::Assistant,
            greeting,
            EntryKind::Greeting,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{PendingProvider, ScriptedProvider};
    use lingochat_config::AppConfig;
    use lingochat_core::error::ProviderError;

    fn settings() -> Arc<SessionSettings> {
        Arc::new(SessionSettings::from_config(&AppConfig::default()).unwrap())
    }

    fn session_with(provider: Arc<ScriptedProvider>) -> ChatSession {
        ChatSession::new(provider, settings())
    }

    #[test]
    fn forget_command_detection() {
        assert!(is_forget_command("forget everything"));
        assert!(is_forget_command("  FORGET   Everything  "));
        assert!(is_forget_command("Forget\teverything\n"));
        assert!(!is_forget_command("please forget everything now"));
        assert!(!is_forget_command("forget everything!"));
        assert!(!is_forget_command("forget it"));
        assert!(!is_forget_command("everything forget"));
    }

    #[test]
    fn new_session_is_idle_with_greeting_only() {
        let session = session_with(Arc::new(ScriptedProvider::replies(&[])));
        assert_eq!(session.state(), TurnState::Idle);
        assert!(session.memory().is_empty());
        assert_eq!(session.transcript().len(), 1);
        assert_eq!(session.transcript()[0].kind, EntryKind::Greeting);
        assert_eq!(
            session.transcript()[0].text,
            "Hello! I'm GemmaBot. I will respond in **English**. Ask me anything!"
        );
    }

    #[tokio::test]
    async fn successful_turn_records_user_and_reply() {
        let provider = Arc::new(ScriptedProvider::replies(&["Hallo Sam!"]));
        let mut session =
            ChatSession::with_language(provider.clone(), settings(), "German").unwrap();

        let outcome = session.submit("Hi, remember my name is Sam").await.unwrap();
        assert!(matches!(outcome, TurnOutcome::Reply { ref content, .. } if content == "Hallo Sam!"));
        assert_eq!(session.state(), TurnState::Idle);

        let memory = session.memory().snapshot();
        assert_eq!(memory.len(), 2);
        assert_eq!(memory[0].role(), Role::User);
        assert_eq!(memory[0].content(), "Hi, remember my name is Sam");
        assert_eq!(memory[1].role(), Role::Assistant);

        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        let instruction = &requests[0].messages[0];
        assert_eq!(instruction.role(), Role::System);
        assert!(instruction.content().contains("respond in the selected German"));
        assert_eq!(requests[0].messages[1].content(), "Hi, remember my name is Sam");
        assert_eq!(requests[0].model, "gemma2-9b-it");
    }

    #[tokio::test]
    async fn history_is_sent_on_following_turns() {
        let provider = Arc::new(ScriptedProvider::replies(&["Nice to meet you", "Your name is Sam"]));
        let mut session = session_with(provider.clone());

        session.submit("My name is Sam").await.unwrap();
        session.submit("What is my name?").await.unwrap();

        let second = &provider.requests()[1];
        let contents: Vec<&str> = second.messages[1..].iter().map(|m| m.content()).collect();
        assert_eq!(contents, ["My name is Sam", "Nice to meet you", "What is my name?"]);
        assert_eq!(session.memory().len(), 4);
    }

    #[tokio::test]
    async fn forget_command_clears_memory_without_calling_model() {
        let provider = Arc::new(ScriptedProvider::replies(&["Hello Sam"]));
        let mut session = session_with(provider.clone());
        session.submit("I am Sam").await.unwrap();
        assert_eq!(session.memory().len(), 2);

        let outcome = session.submit("Forget everything").await.unwrap();
        assert_eq!(
            outcome,
            TurnOutcome::MemoryWiped {
                notice: FORGET_NOTICE.into()
            }
        );
        assert!(session.memory().is_empty());
        assert_eq!(session.state(), TurnState::Idle);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn mentioning_forget_in_a_sentence_keeps_memory() {
        let provider = Arc::new(ScriptedProvider::replies(&[
            "Noted, no nuts.",
            "I will keep it in mind.",
        ]));
        let mut session = session_with(provider.clone());
        session.submit("I am allergic to nuts").await.unwrap();

        let outcome = session
            .submit("Please don't forget everything I told you about my allergy")
            .await
            .unwrap();
        assert!(matches!(outcome, TurnOutcome::Reply { .. }));
        assert_eq!(session.memory().len(), 4);
        assert_eq!(session.memory().messages()[0].content(), "I am allergic to nuts");
        assert_eq!(provider.call_count(), 2);

        // The earlier turn is still part of what the model sees.
        let second = &provider.requests()[1];
        assert_eq!(second.messages[1].content(), "I am allergic to nuts");
    }

    #[tokio::test]
    async fn upstream_error_keeps_user_message_only() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Err(ProviderError::Network("connection reset".into())),
            Ok("Back online".into()),
        ]));
        let mut session = session_with(provider.clone());

        let outcome = session.submit("Hello?").await.unwrap();
        match outcome {
            TurnOutcome::Failed { notice, detail } => {
                assert_eq!(notice, UPSTREAM_FAILURE_NOTICE);
                assert!(detail.contains("connection reset"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(session.state(), TurnState::Error);
        let memory = session.memory().snapshot();
        assert_eq!(memory.len(), 1);
        assert_eq!(memory[0].role(), Role::User);
        assert_eq!(session.transcript().last().unwrap().kind, EntryKind::Error);

        // The next turn is processed normally.
        let outcome = session.submit("Are you there?").await.unwrap();
        assert!(matches!(outcome, TurnOutcome::Reply { .. }));
        assert_eq!(session.state(), TurnState::Idle);
        assert_eq!(session.memory().len(), 3);
    }

    #[tokio::test]
    async fn empty_model_reply_is_treated_as_upstream_failure() {
        let provider = Arc::new(ScriptedProvider::replies(&["   "]));
        let mut session = session_with(provider);

        let outcome = session.submit("Hello").await.unwrap();
        assert!(matches!(outcome, TurnOutcome::Failed { .. }));
        assert_eq!(session.memory().len(), 1);
    }

    #[tokio::test]
    async fn empty_input_is_rejected_without_side_effects() {
        let provider = Arc::new(ScriptedProvider::replies(&[]));
        let mut session = session_with(provider.clone());

        let err = session.submit("   ").await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(session.memory().is_empty());
        assert_eq!(session.transcript().len(), 1);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn reset_from_error_state_returns_to_idle_with_new_id() {
        let provider = Arc::new(ScriptedProvider::new(vec![Err(ProviderError::Timeout(
            "120s".into(),
        ))]));
        let mut session = session_with(provider);
        session.submit("Hello").await.unwrap();
        assert_eq!(session.state(), TurnState::Error);

        let old_id = session.id().clone();
        session.reset();
        assert_ne!(session.id(), &old_id);
        assert_eq!(session.state(), TurnState::Idle);
        assert!(session.memory().is_empty());
        assert_eq!(session.transcript().len(), 1);
    }

    #[tokio::test]
    async fn changing_language_starts_a_new_chat() {
        let provider = Arc::new(ScriptedProvider::replies(&["Hi"]));
        let mut session = session_with(provider);
        session.submit("Hello").await.unwrap();
        let old_id = session.id().clone();

        assert!(!session.set_language("english").unwrap());
        assert_eq!(session.id(), &old_id);
        assert_eq!(session.memory().len(), 2);

        assert!(session.set_language("French").unwrap());
        assert_ne!(session.id(), &old_id);
        assert!(session.memory().is_empty());
        assert_eq!(session.language().as_str(), "French");
        assert!(session.transcript()[0].text.contains("**French**"));
    }

    #[test]
    fn unsupported_language_is_rejected() {
        let provider = Arc::new(ScriptedProvider::replies(&[]));
        let err = ChatSession::with_language(provider, settings(), "Dothraki")
            .err()
            .unwrap();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn long_history_is_trimmed_before_sending() {
        let mut config = AppConfig::default();
        config.memory.trim_budget = 10;
        let settings = Arc::new(SessionSettings::from_config(&config).unwrap());
        let provider = Arc::new(ScriptedProvider::replies(&[
            "one two three four",
            "five six seven eight",
        ]));
        let mut session = ChatSession::new(provider.clone(), settings);

        session.submit("alpha beta gamma delta omega").await.unwrap();
        session.submit("epsilon zeta").await.unwrap();

        // memory: 5 + 4 + 2 words; only the last two fit into 10
        let sent = &provider.requests()[1].messages;
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[1].content(), "one two three four");
        assert_eq!(sent[2].content(), "epsilon zeta");
        assert_eq!(session.memory().len(), 4);
    }

    #[tokio::test]
    async fn abandoned_turn_blocks_input_until_forget_or_reset() {
        let mut session = ChatSession::new(Arc::new(PendingProvider), settings());

        let abandoned =
            tokio::time::timeout(std::time::Duration::from_millis(20), session.submit("Hello"))
                .await;
        assert!(abandoned.is_err());
        assert_eq!(session.state(), TurnState::AwaitingReply);
        assert_eq!(session.memory().len(), 1);

        let err = session.submit("Anyone there?").await.unwrap_err();
        assert_eq!(err, Error::TurnInProgress);

        let outcome = session.submit("forget everything").await.unwrap();
        assert!(matches!(outcome, TurnOutcome::MemoryWiped { .. }));
        assert_eq!(session.state(), TurnState::Idle);
        assert!(session.memory().is_empty());
    }

    #[test]
    fn outcome_serializes_with_kind_tag() {
        let json = serde_json::to_value(TurnOutcome::MemoryWiped {
            notice: "gone".into(),
        })
        .unwrap();
        assert_eq!(json["kind"], "memory_wiped");
        assert_eq!(json["notice"], "gone");
    }
}
