//! # LingoChat Core
//!
//! Domain types, traits, and error definitions for the LingoChat
//! multilingual chat front-end. This crate has **no framework dependencies**:
//! it defines the domain model that the other crates implement against.
//!
//! ## Design Philosophy
//!
//! The model backend is defined as a trait here ([`Provider`]); the concrete
//! HTTP client lives in `lingochat-providers`. This enables:
//! - Swapping the inference endpoint via configuration
//! - Easy testing with scripted mock providers
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod language;
pub mod message;
pub mod provider;
pub mod session;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ProviderError, Result};
pub use language::{Language, LanguageSet};
pub use message::{Message, Role, SizeMetric};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
pub use session::SessionId;
