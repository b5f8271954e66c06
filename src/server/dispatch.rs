//! Resolves a normalized request to its backend and runs the completion

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use crate::core::backend::Backend;
use crate::core::errors::Result;
use crate::core::models::{BackendSelector, TranslationRequest};
use crate::core::registry::Registry;

/// Translated text together with the backend that produced it
#[derive(Debug)]
pub struct Completion {
    pub backend: Arc<Backend>,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<Registry>,
    request_timeout: Option<Duration>,
}

impl Dispatcher {
    pub fn new(registry: Arc<Registry>, request_timeout: Option<Duration>) -> Self {
        Self {
            registry,
            request_timeout,
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn resolve(&self, selector: &BackendSelector) -> Result<Arc<Backend>> {
        let resolved = match selector {
            BackendSelector::Name(name) => self.registry.lookup_by_name(name),
            BackendSelector::Route(route) => self.registry.lookup_by_route(route),
        };
        if resolved.is_err() {
            warn!(
                %selector,
                known = ?self.registry.list_names(),
                "backend not found"
            );
        }
        resolved
    }

    /// Run one request to completion.
    ///
    /// The call is canceled when the returned future is dropped or when the
    /// configured request deadline passes, whichever comes first.
    pub async fn dispatch(&self, request: &TranslationRequest) -> Result<Completion> {
        let backend = self.resolve(&request.selector)?;

        let cancel = CancellationToken::new();
        let _guard = cancel.clone().drop_guard();
        if let Some(timeout) = self.request_timeout {
            let deadline = cancel.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = tokio::time::sleep(timeout) => deadline.cancel(),
                    _ = deadline.cancelled() => {}
                }
            });
        }

        match backend
            .complete(
                &request.text,
                &request.from,
                &request.to,
                request.force_refresh,
                &cancel,
            )
            .await
        {
            Ok(text) => Ok(Completion { backend, text }),
            Err(e) => {
                error!(
                    backend = backend.name(),
                    selector = %request.selector,
                    from = %request.from,
                    to = %request.to,
                    text_len = request.text.len(),
                    force_refresh = request.force_refresh,
                    error = %e,
                    "error translating text"
                );
                Err(e)
            }
        }
    }
}
