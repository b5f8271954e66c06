//! A configured language-model backend: cache, admission control and the
//! remote provider behind a single `complete` call.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info_span, warn, Instrument, Span};

use crate::core::cache::{fingerprint, ResponseCache};
use crate::core::errors::{Result, TranslationError};
use crate::core::limiter::AdmissionController;
use crate::core::models::BackendConfig;
use crate::core::provider::{build_provider, CompletionProvider, CompletionRequest};

/// Text some upstream models return instead of output they refuse to produce
pub const CONTENT_BLOCKED_SENTINEL: &str = "内容由于不合规被停止生成";

/// One backend per configured model; never mutated after construction
#[derive(Debug)]
pub struct Backend {
    config: BackendConfig,
    provider: Arc<dyn CompletionProvider>,
    limiter: AdmissionController,
    cache: ResponseCache,
    span: Span,
}

impl Backend {
    /// Create a backend around an explicit provider
    pub fn new(config: BackendConfig, provider: Arc<dyn CompletionProvider>) -> Result<Self> {
        let limiter = AdmissionController::new(config.rate_limit)?;
        let span = info_span!(
            "backend",
            name = %config.name,
            route = %config.endpoint,
            model = %config.model_name,
        );

        Ok(Self {
            config,
            provider,
            limiter,
            cache: ResponseCache::new(),
            span,
        })
    }

    /// Create a backend with the provider its configuration names
    pub fn from_config(config: BackendConfig) -> Result<Self> {
        let provider = build_provider(&config)?;
        Self::new(config, provider)
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn model_name(&self) -> &str {
        &self.config.model_name
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Translate `text` from `from` to `to`.
    ///
    /// A cache hit returns without consuming an admission token unless
    /// `force_refresh` is set. Only successful completions are cached.
    pub async fn complete(
        &self,
        text: &str,
        from: &str,
        to: &str,
        force_refresh: bool,
        cancel: &CancellationToken,
    ) -> Result<String> {
        self.complete_inner(text, from, to, force_refresh, cancel)
            .instrument(self.span.clone())
            .await
    }

    async fn complete_inner(
        &self,
        text: &str,
        from: &str,
        to: &str,
        force_refresh: bool,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let key = fingerprint(&self.config.name, &self.config.model_name, from, to, text);

        if force_refresh {
            debug!(from, to, "force refresh, skipping cache");
        } else if let Some(cached) = self.cache.get(&key) {
            debug!(from, to, "cache hit");
            return Ok(cached);
        } else {
            debug!(from, to, "cache miss");
        }

        let waited = self.limiter.acquire(cancel).await.map_err(|_| {
            warn!(from, to, "admission wait canceled");
            TranslationError::RateLimited {
                backend: self.config.name.clone(),
            }
        })?;
        if !waited.is_zero() {
            debug!(waited_ms = waited.as_millis() as u64, "admission granted after wait");
        }

        let request = CompletionRequest {
            model: &self.config.model_name,
            prompt: self.config.prompt.render(from, to, text),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let reply = tokio::select! {
            reply = self.provider.complete(&request) => reply,
            _ = cancel.cancelled() => Err(TranslationError::ProviderError {
                message: "request canceled".to_string(),
            }),
        };

        let content = match reply {
            Ok(content) => content,
            Err(e) => {
                error!(from, to, error = %e, "completion failed");
                return Err(match e {
                    TranslationError::ProviderError { .. } => e,
                    other => TranslationError::ProviderError {
                        message: other.to_string(),
                    },
                });
            }
        };

        if content.trim().is_empty() {
            error!(from, to, "empty completion");
            return Err(TranslationError::EmptyResponse {
                model: self.config.model_name.clone(),
            });
        }

        if content.contains(CONTENT_BLOCKED_SENTINEL) {
            error!(from, to, content = %content, "content blocked by model");
            return Err(TranslationError::ContentBlocked {
                model: self.config.model_name.clone(),
            });
        }

        self.cache.set(key, content.clone(), self.config.cache_ttl);
        Ok(content)
    }
}
