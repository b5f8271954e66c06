//! Directory of backends indexed by logical name and by route.

use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::core::backend::Backend;
use crate::core::errors::{Result, TranslationError};
use crate::core::models::BackendConfig;

/// Strip leading and trailing slashes so `/gpt/` and `gpt` name one route
pub fn normalize_route(route: &str) -> &str {
    route.trim_matches('/')
}

#[derive(Debug, Default)]
struct Indices {
    backends: Vec<Arc<Backend>>,
    by_name: HashMap<String, Arc<Backend>>,
    by_route: HashMap<String, Arc<Backend>>,
}

/// Concurrent-safe backend directory, populated at startup
#[derive(Debug, Default)]
pub struct Registry {
    inner: RwLock<Indices>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build one backend per configuration entry and register each under
    /// its configured endpoint. Any duplicate name or route fails the build.
    pub fn from_configs(configs: Vec<BackendConfig>) -> Result<Self> {
        let registry = Self::new();
        for config in configs {
            let route = config.endpoint.clone();
            let backend = Arc::new(Backend::from_config(config)?);
            debug!(name = backend.name(), route = %route, "adding backend");
            registry.register(&route, backend)?;
        }
        info!(count = registry.len(), "backends registered");
        Ok(registry)
    }

    /// Insert `backend` under `route` and under its own name.
    ///
    /// A route or name already present is reported as an error and leaves
    /// both indices untouched; the first registration stays reachable.
    pub fn register(&self, route: &str, backend: Arc<Backend>) -> Result<()> {
        let route = normalize_route(route);
        let mut inner = self.inner.write();

        if inner.by_route.contains_key(route) {
            error!(route, name = backend.name(), "route already registered");
            return Err(TranslationError::DuplicateRoute {
                route: route.to_string(),
            });
        }
        if inner.by_name.contains_key(backend.name()) {
            error!(route, name = backend.name(), "backend name already registered");
            return Err(TranslationError::DuplicateName {
                name: backend.name().to_string(),
            });
        }

        inner.by_route.insert(route.to_string(), backend.clone());
        inner.by_name.insert(backend.name().to_string(), backend.clone());
        inner.backends.push(backend);
        Ok(())
    }

    pub fn lookup_by_name(&self, name: &str) -> Result<Arc<Backend>> {
        self.inner
            .read()
            .by_name
            .get(name)
            .cloned()
            .ok_or_else(|| TranslationError::BackendNotFound {
                selector: format!("name={}", name),
            })
    }

    pub fn lookup_by_route(&self, route: &str) -> Result<Arc<Backend>> {
        let route = normalize_route(route);
        self.inner
            .read()
            .by_route
            .get(route)
            .cloned()
            .ok_or_else(|| TranslationError::BackendNotFound {
                selector: format!("route={}", route),
            })
    }

    pub fn list_names(&self) -> BTreeSet<String> {
        self.inner.read().by_name.keys().cloned().collect()
    }

    pub fn list_routes(&self) -> BTreeSet<String> {
        self.inner.read().by_route.keys().cloned().collect()
    }

    /// Every registered backend, in registration order
    pub fn backends(&self) -> Vec<Arc<Backend>> {
        self.inner.read().backends.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.read().backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
