//! LLM Provider implementations for LingoChat.
//!
//! All providers implement the `lingochat_core::Provider` trait.
//! [`build_from_config`] creates the configured provider at startup.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;

use lingochat_config::AppConfig;
use lingochat_core::{Error, Provider};
use std::sync::Arc;
use std::time::Duration;

/// Build the provider described by `config`.
///
/// A missing API key is a configuration error, reported before any request
/// is attempted.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, Error> {
    let api_key = config
        .require_api_key()
        .map_err(|e| Error::config(e.to_string()))?;

    let provider = OpenAiCompatProvider::with_timeout(
        &config.provider,
        &config.base_url,
        api_key,
        Duration::from_secs(config.request_timeout_secs),
    )
    .map_err(|e| Error::config(e.to_string()))?;

    tracing::info!(
        provider = %config.provider,
        base_url = %config.base_url,
        model = %config.model,
        "Provider configured"
    );

    Ok(Arc::new(provider))
}
