//! Per-deployment settings shared by every chat session.

use lingochat_config::AppConfig;
use lingochat_core::error::{Error, Result};
use lingochat_core::language::{Language, LanguageSet};
use lingochat_core::message::SizeMetric;
use lingochat_memory::Trimmer;

use crate::assembler::PromptAssembler;

/// Everything a [`ChatSession`](crate::ChatSession) needs besides its
/// provider. Built once at startup and shared behind an `Arc`.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub size_metric: SizeMetric,
    pub trimmer: Trimmer,
    pub assembler: PromptAssembler,
    pub default_language: Language,
}

impl SessionSettings {
    /// Derive settings from validated configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let languages = LanguageSet::new(&config.languages.supported)?;
        let default_language = languages
            .resolve(&config.languages.default)
            .map_err(|e| Error::config(e.to_string()))?;

        Ok(Self {
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: Some(config.max_tokens),
            size_metric: config.memory.size_metric,
            trimmer: Trimmer::new(config.memory.trim_budget)?
                .with_start_on_user(config.memory.start_on_user),
            assembler: PromptAssembler::new(
                &config.persona.system_template,
                &config.persona.bot_name,
                languages,
            ),
            default_language,
        })
    }

    pub fn languages(&self) -> &LanguageSet {
        self.assembler.languages()
    }

    pub fn bot_name(&self) -> &str {
        self.assembler.bot_name()
    }
}
