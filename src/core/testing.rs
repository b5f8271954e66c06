//! Test doubles shared by unit tests across the crate

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::core::backend::Backend;
use crate::core::errors::{Result, TranslationError};
use crate::core::models::{BackendConfig, PromptTemplate, ProviderKind};
use crate::core::provider::{CompletionProvider, CompletionRequest};

#[derive(Debug, Clone)]
pub enum Reply {
    /// Always the same text
    Fixed(String),
    /// The rendered prompt itself
    Echo,
    /// `reply-<n>` where n counts calls from 1
    Counter,
    /// A provider failure
    Fail,
    /// Never completes
    Hang,
}

#[derive(Debug)]
pub struct StubProvider {
    reply: Reply,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
}

impl StubProvider {
    pub fn new(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        })
    }

    pub fn fixed(text: &str) -> Arc<Self> {
        Self::new(Reply::Fixed(text.to_string()))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().clone()
    }
}

#[async_trait]
impl CompletionProvider for StubProvider {
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        *self.last_prompt.lock() = Some(request.prompt.clone());

        match &self.reply {
            Reply::Fixed(text) => Ok(text.clone()),
            Reply::Echo => Ok(request.prompt.clone()),
            Reply::Counter => Ok(format!("reply-{}", n)),
            Reply::Fail => Err(TranslationError::ProviderError {
                message: "upstream returned 502".to_string(),
            }),
            Reply::Hang => std::future::pending().await,
        }
    }
}

pub fn backend_config(name: &str, endpoint: &str) -> BackendConfig {
    BackendConfig {
        name: name.to_string(),
        endpoint: endpoint.to_string(),
        base_url: "http://127.0.0.1:9/v1".to_string(),
        provider: ProviderKind::OpenAi,
        api_key: "test-key".to_string(),
        model_name: format!("{}-model", name),
        max_tokens: 1024,
        temperature: 0.3,
        prompt: PromptTemplate::parse("%s->%s:%s").expect("valid prompt"),
        rate_limit: 2.0,
        cache_ttl: Duration::from_secs(3600),
        timeout: Duration::from_secs(5),
    }
}

pub fn stub_backend(name: &str, endpoint: &str, provider: Arc<StubProvider>) -> Arc<Backend> {
    Arc::new(Backend::new(backend_config(name, endpoint), provider).expect("valid backend"))
}
