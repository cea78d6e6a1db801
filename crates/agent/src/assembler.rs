//! Prompt assembly.
//!
//! Turns the trimmed history plus the selected output language into the
//! message list sent to the model:
//!
//! 1. **Language instruction**: rendered from the persona template
//! 2. **History**: the trimmer's output, in original order
//!
//! Assembly is deterministic apart from the fresh id/timestamp on the
//! instruction message.

use lingochat_core::error::Result;
use lingochat_core::language::{Language, LanguageSet};
use lingochat_core::message::Message;
use lingochat_core::provider::ProviderRequest;

/// A prompt ready to be wrapped into a provider request.
#[derive(Debug, Clone)]
pub struct Prompt {
    /// Instruction first, then the trimmed history.
    pub messages: Vec<Message>,
    /// The language the instruction demands.
    pub language: Language,
}

impl Prompt {
    /// The system instruction at the head of the prompt.
    pub fn instruction(&self) -> &Message {
        &self.messages[0]
    }

    /// Wrap into a provider request with the given generation parameters.
    pub fn into_request(
        self,
        model: impl Into<String>,
        temperature: f32,
        max_tokens: Option<u32>,
    ) -> ProviderRequest {
        ProviderRequest {
            model: model.into(),
            messages: self.messages,
            temperature,
            max_tokens,
        }
    }
}

/// Builds prompts from a persona template. Stateless; create one and reuse it.
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    template: String,
    bot_name: String,
    languages: LanguageSet,
}

impl PromptAssembler {
    /// `template` may use `{language}` and `{bot_name}` placeholders.
    pub fn new(
        template: impl Into<String>,
        bot_name: impl Into<String>,
        languages: LanguageSet,
    ) -> Self {
        Self {
            template: template.into(),
            bot_name: bot_name.into(),
            languages,
        }
    }

    pub fn languages(&self) -> &LanguageSet {
        &self.languages
    }

    pub fn bot_name(&self) -> &str {
        &self.bot_name
    }

    /// Render the system instruction for `language`.
    pub fn instruction_for(&self, language: &Language) -> String {
        self.template
            .replace("{language}", language.as_str())
            .replace("{bot_name}", &self.bot_name)
    }

    /// Assemble the prompt for one model call.
    ///
    /// Fails with a validation error if `output_language` is empty or not
    /// one of the supported languages.
    pub fn assemble(&self, trimmed: Vec<Message>, output_language: &str) -> Result<Prompt> {
        let language = self.languages.resolve(output_language)?;

        let mut messages = Vec::with_capacity(trimmed.len() + 1);
        messages.push(Message::system(self.instruction_for(&language)));
        messages.extend(trimmed);

        Ok(Prompt { messages, language })
    }
}
