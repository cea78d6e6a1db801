//! Error types for the LingoChat domain.
//!
//! Uses `thiserror` for ergonomic error definitions. The top-level [`Error`]
//! mirrors the three failure classes a chat turn can hit; [`ProviderError`]
//! keeps the transport-level detail that the model client reports.

use thiserror::Error;

/// The top-level error type for all LingoChat operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Malformed message or unsupported language. Caller error.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Invalid trim budget or missing credential. Fatal at the point of use.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Any failure reported by the model client, flattened to a message.
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// A user turn arrived while the previous one is still awaiting a reply.
    #[error("A reply is still pending for this session")]
    TurnInProgress,
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

impl From<ProviderError> for Error {
    fn from(err: ProviderError) -> Self {
        Self::Upstream(err.to_string())
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures reported by a model provider.
///
/// The session controller does not branch on these; they exist so logs and
/// diagnostics can tell a bad key from a dropped connection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}
