//! Output languages.
//!
//! The user picks the language the model must answer in. A [`Language`] can
//! only be obtained through a [`LanguageSet`], so holding one proves the
//! name was validated against the supported list.

use serde::Serialize;

use crate::error::{Error, Result};

/// Languages offered when nothing else is configured.
pub const DEFAULT_LANGUAGES: [&str; 6] = ["English", "Hindi", "Spanish", "French", "Japanese", "German"];

/// A validated output language, in its canonical spelling.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Language(String);

impl Language {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The set of languages a deployment supports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageSet {
    names: Vec<String>,
}

impl LanguageSet {
    /// Build a set from configured names. Blank and duplicate (case-insensitive)
    /// entries are dropped; an empty result is a configuration error.
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut unique: Vec<String> = Vec::new();
        for name in names {
            let name = name.as_ref().trim();
            if name.is_empty() || unique.iter().any(|n| n.eq_ignore_ascii_case(name)) {
                continue;
            }
            unique.push(name.to_string());
        }
        if unique.is_empty() {
            return Err(Error::config("at least one output language must be supported"));
        }
        Ok(Self { names: unique })
    }

    /// Validate `input` and return the canonical language.
    ///
    /// Matching is case-insensitive and ignores surrounding whitespace.
    pub fn resolve(&self, input: &str) -> Result<Language> {
        let wanted = input.trim();
        if wanted.is_empty() {
            return Err(Error::validation("output language must not be empty"));
        }
        self.names
            .iter()
            .find(|n| n.eq_ignore_ascii_case(wanted))
            .map(|n| Language(n.clone()))
            .ok_or_else(|| {
                Error::validation(format!(
                    "unsupported output language '{wanted}' (supported: {})",
                    self.names.join(", ")
                ))
            })
    }

    pub fn contains(&self, language: &Language) -> bool {
        self.names.iter().any(|n| n == language.as_str())
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

impl Default for LanguageSet {
    fn default() -> Self {
        Self {
            names: DEFAULT_LANGUAGES.iter().map(|s| s.to_string()).collect(),
        }
    }
}
