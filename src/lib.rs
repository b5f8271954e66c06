//! Polyglot Gate - translation gateway for LLM backends
//!
//! This library routes translation requests arriving in several wire formats
//! (native, hcfy browser extension, DeepL-compatible) onto a registry of
//! rate-limited, cached language-model backends.

#![forbid(unsafe_code)]

pub mod cli;
pub mod core;
pub mod server;

// Re-export key types for convenience
pub use core::{
    backend::Backend,
    cache::ResponseCache,
    config::GatewayConfig,
    errors::TranslationError,
    limiter::AdmissionController,
    models::{BackendConfig, BackendSelector, PromptTemplate, TranslationRequest},
    provider::{CompletionProvider, OpenAiProvider},
    registry::Registry,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
