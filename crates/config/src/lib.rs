//! Configuration loading, validation, and management for LingoChat.
//!
//! Loads configuration from `~/.lingochat/config.toml` with environment
//! variable overrides, which may also come from a `.env` file in the working
//! directory. Validates all settings at startup.

use lingochat_core::language::{DEFAULT_LANGUAGES, LanguageSet};
use lingochat_core::message::SizeMetric;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Env file read from the working directory by [`AppConfig::load`].
pub const ENV_FILE: &str = ".env";

/// The default system prompt. `{language}` and `{bot_name}` are substituted
/// before every request.
pub const DEFAULT_SYSTEM_TEMPLATE: &str = "You are a helpful assistant. Answer all questions to the best of your ability in {language}. Your name is {bot_name}. The user's input might be in English, but you MUST respond in the selected {language}.";

/// The root configuration structure.
///
/// Maps directly to `~/.lingochat/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the inference endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Provider name, used in logs
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Base URL of the OpenAI-compatible API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model identifier
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Max tokens per reply
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// HTTP timeout for one completion request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Conversation memory and trimming
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Output language selection
    #[serde(default)]
    pub languages: LanguageConfig,

    /// Bot name and system prompt
    #[serde(default)]
    pub persona: PersonaConfig,

    /// Web server settings
    #[serde(default)]
    pub gateway: GatewayConfig,
}

fn default_provider() -> String {
    "groq".into()
}
fn default_base_url() -> String {
    "https://api.groq.com/openai/v1".into()
}
fn default_model() -> String {
    "gemma2-9b-it".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_request_timeout_secs() -> u64 {
    120
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("memory", &self.memory)
            .field("languages", &self.languages)
            .field("persona", &self.persona)
            .field("gateway", &self.gateway)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Budget the trimmer fits history into, in `size_metric` units
    #[serde(default = "default_trim_budget")]
    pub trim_budget: usize,

    #[serde(default)]
    pub size_metric: SizeMetric,

    /// Drop leading assistant turns so trimmed history starts on a user turn
    #[serde(default)]
    pub start_on_user: bool,
}

fn default_trim_budget() -> usize {
    200
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            trim_budget: default_trim_budget(),
            size_metric: SizeMetric::default(),
            start_on_user: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageConfig {
    #[serde(default = "default_supported_languages")]
    pub supported: Vec<String>,

    #[serde(default = "default_language")]
    pub default: String,
}

fn default_supported_languages() -> Vec<String> {
    DEFAULT_LANGUAGES.iter().map(|s| s.to_string()).collect()
}
fn default_language() -> String {
    "English".into()
}

impl LanguageConfig {
    /// Build the validated language set.
    pub fn language_set(&self) -> Result<LanguageSet, ConfigError> {
        LanguageSet::new(&self.supported).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self {
            supported: default_supported_languages(),
            default: default_language(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaConfig {
    #[serde(default = "default_bot_name")]
    pub bot_name: String,

    /// System prompt template; must contain `{language}`
    #[serde(default = "default_system_template")]
    pub system_template: String,
}

fn default_bot_name() -> String {
    "GemmaBot".into()
}
fn default_system_template() -> String {
    DEFAULT_SYSTEM_TEMPLATE.into()
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            bot_name: default_bot_name(),
            system_template: default_system_template(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Extra origin allowed by CORS (the page itself is same-origin)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cors_origin: Option<String>,

    /// Maximum live sessions before the least recently active is evicted
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

fn default_port() -> u16 {
    8501
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_max_sessions() -> usize {
    1_000
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            cors_origin: None,
            max_sessions: default_max_sessions(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.lingochat/config.toml).
    ///
    /// Environment variables override the file:
    /// - `LINGOCHAT_API_KEY` (highest priority), then `GROQ_API_KEY`
    /// - `LINGOCHAT_MODEL`
    /// - `LINGOCHAT_BASE_URL`
    ///
    /// Any of these may also be set in `./.env`. Process variables win over
    /// the file.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        Self::load_layered(&config_path, Path::new(ENV_FILE), |key| {
            std::env::var(key).ok()
        })
    }

    /// Load `config_path`, then apply overrides from `lookup` (the process
    /// environment) falling back to the pairs in `env_file`.
    pub fn load_layered(
        config_path: &Path,
        env_file: &Path,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(config_path)?;
        let file_vars = read_env_file(env_file)?;
        config.apply_env_overrides(|key| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .or_else(|| file_vars.get(key).cloned())
        });
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup` (normally `std::env::var`).
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("LINGOCHAT_API_KEY").or_else(|| non_empty("GROQ_API_KEY")) {
            self.api_key = Some(key);
        }
        if let Some(model) = non_empty("LINGOCHAT_MODEL") {
            self.model = model;
        }
        if let Some(url) = non_empty("LINGOCHAT_BASE_URL") {
            self.base_url = url;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".lingochat")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.memory.trim_budget == 0 {
            return Err(ConfigError::ValidationError(
                "memory.trim_budget must be a positive integer".into(),
            ));
        }

        if self.model.trim().is_empty() {
            return Err(ConfigError::ValidationError("model must not be empty".into()));
        }

        if !self.persona.system_template.contains("{language}") {
            return Err(ConfigError::ValidationError(
                "persona.system_template must contain the {language} placeholder".into(),
            ));
        }

        let languages = self.languages.language_set()?;
        languages.resolve(&self.languages.default).map_err(|_| {
            ConfigError::ValidationError(format!(
                "languages.default '{}' is not in languages.supported",
                self.languages.default
            ))
        })?;

        Ok(())
    }

    /// Return the API key, or fail: running without one is a startup error.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)
    }

    /// Generate a default config TOML string (for `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            provider: default_provider(),
            base_url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            request_timeout_secs: default_request_timeout_secs(),
            memory: MemoryConfig::default(),
            languages: LanguageConfig::default(),
            persona: PersonaConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

/// Read `KEY=value` pairs from a dotenv-style file. A missing file yields an
/// empty map. The process environment is left untouched.
pub fn read_env_file(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    if !path.exists() {
        return Ok(HashMap::new());
    }

    let pairs = dotenvy::from_path_iter(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let vars = pairs
        .collect::<Result<HashMap<_, _>, _>>()
        .map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    tracing::debug!(path = %path.display(), vars = vars.len(), "Read env file");
    Ok(vars)
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("No API key configured: set LINGOCHAT_API_KEY or GROQ_API_KEY (in the environment or a .env file), or api_key in config.toml")]
    MissingApiKey,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.provider, "groq");
        assert_eq!(config.memory.trim_budget, 200);
        assert_eq!(config.languages.default, "English");
        assert_eq!(config.persona.bot_name, "GemmaBot");
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.model, config.model);
        assert_eq!(parsed.gateway.port, config.gateway.port);
        assert_eq!(parsed.languages.supported, config.languages.supported);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let config = AppConfig {
            temperature: 5.0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_trim_budget_rejected() {
        let mut config = AppConfig::default();
        config.memory.trim_budget = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("trim_budget"));
    }

    #[test]
    fn negative_trim_budget_fails_to_parse() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[memory]\ntrim_budget = -5\n").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn default_language_must_be_supported() {
        let mut config = AppConfig::default();
        config.languages.default = "Klingon".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn template_without_language_placeholder_rejected() {
        let mut config = AppConfig::default();
        config.persona.system_template = "Be nice.".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        let config = result.unwrap();
        assert_eq!(config.model, "gemma2-9b-it");
    }

    #[test]
    fn load_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
model = "llama-3.1-8b-instant"

[memory]
trim_budget = 500
size_metric = "tokens"
start_on_user = true

[languages]
supported = ["English", "German"]
default = "German"
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.model, "llama-3.1-8b-instant");
        assert_eq!(config.memory.trim_budget, 500);
        assert_eq!(config.memory.size_metric, SizeMetric::Tokens);
        assert!(config.memory.start_on_user);
        assert_eq!(config.languages.default, "German");
        assert_eq!(config.base_url, "https://api.groq.com/openai/v1");
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "model = [").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn env_overrides_prefer_lingochat_key() {
        let env: HashMap<&str, &str> = [
            ("LINGOCHAT_API_KEY", "lc-key"),
            ("GROQ_API_KEY", "gsk-key"),
            ("LINGOCHAT_MODEL", "mixtral"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.apply_env_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.api_key.as_deref(), Some("lc-key"));
        assert_eq!(config.model, "mixtral");
    }

    #[test]
    fn env_falls_back_to_groq_key_and_ignores_blank() {
        let env: HashMap<&str, &str> =
            [("LINGOCHAT_API_KEY", "  "), ("GROQ_API_KEY", "gsk-key")].into_iter().collect();

        let mut config = AppConfig::default();
        config.apply_env_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.api_key.as_deref(), Some("gsk-key"));
    }

    #[test]
    fn dotenv_file_supplies_groq_key() {
        let dir = tempfile::tempdir().unwrap();
        let env_file = dir.path().join(".env");
        std::fs::write(
            &env_file,
            "# keys for local runs\nGROQ_API_KEY=gsk-from-dotenv\nLINGOCHAT_MODEL=\"llama3-8b-8192\"\n",
        )
        .unwrap();

        let config = AppConfig::load_layered(&dir.path().join("config.toml"), &env_file, |_| None)
            .unwrap();
        assert_eq!(config.api_key.as_deref(), Some("gsk-from-dotenv"));
        assert_eq!(config.model, "llama3-8b-8192");
        assert!(config.require_api_key().is_ok());
    }

    #[test]
    fn process_env_wins_over_dotenv_file() {
        let dir = tempfile::tempdir().unwrap();
        let env_file = dir.path().join(".env");
        std::fs::write(&env_file, "GROQ_API_KEY=gsk-from-dotenv\n").unwrap();

        let config = AppConfig::load_layered(&dir.path().join("config.toml"), &env_file, |key| {
            (key == "GROQ_API_KEY").then(|| "gsk-from-shell".to_string())
        })
        .unwrap();
        assert_eq!(config.api_key.as_deref(), Some("gsk-from-shell"));
    }

    #[test]
    fn missing_dotenv_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_env_file(&dir.path().join(".env")).unwrap().is_empty());

        let config = AppConfig::load_layered(
            &dir.path().join("config.toml"),
            &dir.path().join(".env"),
            |_| None,
        )
        .unwrap();
        assert!(config.api_key.is_none());
    }

    #[test]
    fn malformed_dotenv_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let env_file = dir.path().join(".env");
        std::fs::write(&env_file, "GROQ_API_KEY gsk-without-equals\n").unwrap();
        assert!(matches!(
            read_env_file(&env_file),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn missing_api_key_is_reported() {
        let config = AppConfig::default();
        assert!(matches!(
            config.require_api_key(),
            Err(ConfigError::MissingApiKey)
        ));

        let config = AppConfig {
            api_key: Some("gsk-123".into()),
            ..AppConfig::default()
        };
        assert_eq!(config.require_api_key().unwrap(), "gsk-123");
    }

    #[test]
    fn debug_output_redacts_api_key() {
        let config = AppConfig {
            api_key: Some("gsk-super-secret".into()),
            ..AppConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("gsk-super-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("gemma2-9b-it"));
        assert!(toml_str.contains("trim_budget = 200"));
        assert!(!toml_str.contains("api_key"));
    }
}
