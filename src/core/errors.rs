//! Custom error types for gateway operations

use thiserror::Error;

/// Gateway errors, from request validation through the remote provider
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Missing or malformed request field
    #[error("Invalid request: {message}")]
    ValidationError {
        message: String,
    },

    /// Missing or unknown bearer token
    #[error("Unauthorized")]
    Unauthorized,

    /// No backend registered under the requested name or route
    #[error("Backend not found: {selector}")]
    BackendNotFound {
        selector: String,
    },

    /// Admission wait was canceled before a token became available
    #[error("Rate limited: admission canceled for backend {backend}")]
    RateLimited {
        backend: String,
    },

    /// Remote completion call failed
    #[error("Provider error: {message}")]
    ProviderError {
        message: String,
    },

    /// Remote model returned no text
    #[error("Empty response from model {model}")]
    EmptyResponse {
        model: String,
    },

    /// Remote model refused to generate the content
    #[error("Content blocked by model {model}")]
    ContentBlocked {
        model: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        message: String,
    },

    /// A second backend tried to claim an existing route
    #[error("Duplicate route: {route}")]
    DuplicateRoute {
        route: String,
    },

    /// A second backend tried to claim an existing name
    #[error("Duplicate backend name: {name}")]
    DuplicateName {
        name: String,
    },
}

impl TranslationError {
    /// Errors caused by the caller's request rather than the gateway
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            TranslationError::ValidationError { .. }
                | TranslationError::Unauthorized
                | TranslationError::BackendNotFound { .. }
        )
    }

    /// Errors a caller may reasonably retry later
    pub fn is_retryable(&self) -> bool {
        matches!(self, TranslationError::RateLimited { .. })
    }

    /// Shorthand for a validation failure
    pub fn invalid(message: impl Into<String>) -> Self {
        TranslationError::ValidationError {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for TranslationError {
    fn from(err: reqwest::Error) -> Self {
        TranslationError::ProviderError {
            message: err.to_string(),
        }
    }
}

/// Result type for gateway operations
pub type Result<T> = std::result::Result<T, TranslationError>;
