//! Remote completion providers

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::core::errors::{Result, TranslationError};
use crate::core::models::{BackendConfig, ProviderKind};

/// Longest slice of an upstream error body kept in error messages
const MAX_ERROR_BODY: usize = 512;

/// One chat completion call, already rendered from the prompt template
#[derive(Debug, Clone)]
pub struct CompletionRequest<'a> {
    pub model: &'a str,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Capability to call a remote completion API.
///
/// Implementations return the raw completion text; an empty string means the
/// model produced no choices. Validation of the text is left to the caller.
#[async_trait]
pub trait CompletionProvider: Send + Sync + fmt::Debug {
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String>;
}

/// OpenAI-compatible `chat/completions` client
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl OpenAiProvider {
    pub fn new(base_url: &str, api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Some(Duration::from_secs(30)))
            .pool_max_idle_per_host(10)
            .build()?;

        Ok(Self {
            client,
            url: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String> {
        let body = serde_json::json!({
            "model": request.model,
            "messages": [{
                "role": "user",
                "content": request.prompt,
            }],
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
        });

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let mut error_text = response.text().await.unwrap_or_default();
            if error_text.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !error_text.is_char_boundary(cut) {
                    cut -= 1;
                }
                error_text.truncate(cut);
            }
            return Err(TranslationError::ProviderError {
                message: format!("{} returned {}: {}", self.url, status.as_u16(), error_text),
            });
        }

        let json: serde_json::Value = response.json().await?;
        let content = json["choices"]
            .get(0)
            .and_then(|c| c["message"]["content"].as_str())
            .unwrap_or_default()
            .to_string();

        if let Some(total) = json["usage"]["total_tokens"].as_u64() {
            debug!(model = request.model, total_tokens = total, "completion usage");
        }

        Ok(content)
    }
}

/// Build the provider named by a backend's configuration
pub fn build_provider(config: &BackendConfig) -> Result<Arc<dyn CompletionProvider>> {
    match config.provider {
        ProviderKind::OpenAi => Ok(Arc::new(OpenAiProvider::new(
            &config.base_url,
            config.api_key.clone(),
            config.timeout,
        )?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_url_joins_base() {
        let provider =
            OpenAiProvider::new("https://api.example.com/v1/", "key", Duration::from_secs(5)).unwrap();
        assert_eq!(provider.url, "https://api.example.com/v1/chat/completions");
    }
}
