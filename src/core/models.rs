//! Core data models for the gateway

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use std::time::Duration;

use crate::core::errors::{Result, TranslationError};

/// Number of placeholders a prompt template must carry: source, target, text
pub const PROMPT_ARGS: usize = 3;

/// Language tag used when the caller does not name a source language
pub const AUTO_LANG: &str = "auto";

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"%[sdfv]").expect("placeholder pattern is valid"))
}

/// Remote provider flavour for a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderKind {
    /// OpenAI-compatible chat completions API
    #[serde(rename = "openai")]
    OpenAi,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::OpenAi => write!(f, "openai"),
        }
    }
}

/// Prompt with exactly three positional placeholders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    raw: String,
}

impl PromptTemplate {
    /// Parse a template, rejecting any placeholder count other than three
    pub fn parse(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(TranslationError::ConfigError {
                message: "prompt must not be empty".to_string(),
            });
        }

        let count = placeholder_pattern().find_iter(&raw).count();
        if count != PROMPT_ARGS {
            return Err(TranslationError::ConfigError {
                message: format!(
                    "prompt must contain exactly {} placeholders, found {}",
                    PROMPT_ARGS, count
                ),
            });
        }

        Ok(Self { raw })
    }

    /// Substitute source language, target language and input text in order
    pub fn render(&self, from: &str, to: &str, text: &str) -> String {
        let args = [from, to, text];
        let mut out = String::with_capacity(self.raw.len() + text.len() + 32);
        let mut last = 0;

        for (m, arg) in placeholder_pattern().find_iter(&self.raw).zip(args) {
            out.push_str(&self.raw[last..m.start()]);
            out.push_str(arg);
            last = m.end();
        }
        out.push_str(&self.raw[last..]);
        out
    }
}

/// Immutable description of one backend, built once at startup
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub name: String,
    pub endpoint: String,
    pub base_url: String,
    pub provider: ProviderKind,
    pub api_key: String,
    pub model_name: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub prompt: PromptTemplate,
    pub rate_limit: f64,
    pub cache_ttl: Duration,
    pub timeout: Duration,
}

/// How a request picks its backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendSelector {
    /// Logical backend name carried in the body
    Name(String),
    /// Route segment taken from the URL path
    Route(String),
}

impl fmt::Display for BackendSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendSelector::Name(name) => write!(f, "name={}", name),
            BackendSelector::Route(route) => write!(f, "route={}", route),
        }
    }
}

/// Normalized translation request, one per inbound call
#[derive(Debug, Clone)]
pub struct TranslationRequest {
    pub text: String,
    pub from: String,
    pub to: String,
    pub force_refresh: bool,
    pub selector: BackendSelector,
}

impl TranslationRequest {
    pub fn new(selector: BackendSelector, text: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            from: AUTO_LANG.to_string(),
            to: to.into(),
            force_refresh: false,
            selector,
        }
    }

    pub fn with_source_lang(mut self, from: impl Into<String>) -> Self {
        self.from = from.into();
        self
    }

    pub fn with_force_refresh(mut self, force_refresh: bool) -> Self {
        self.force_refresh = force_refresh;
        self
    }
}
