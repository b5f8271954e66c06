//! Configuration management

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

use crate::core::limiter::AdmissionController;
use crate::core::models::{BackendConfig, PromptTemplate, ProviderKind};
use crate::core::registry::normalize_route;

/// Prefix for environment overrides, e.g. `POLYGLOT__PORT=9000`
pub const ENV_PREFIX: &str = "POLYGLOT";

/// Ten years; longer lifetimes cannot be represented as an expiry instant
pub const MAX_CACHE_EXPIRE_HOURS: u64 = 10 * 365 * 24;

fn default_timeout_secs() -> u64 {
    60
}

fn default_sweep_interval_secs() -> u64 {
    600
}

/// One `[[models]]` entry as written in the configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub name: String,
    pub base_url: String,
    #[serde(rename = "type")]
    pub provider: String,
    pub api_key: String,
    pub model_name: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub prompt: String,
    pub rate_limit: f64,
    pub endpoint: String,
    pub cache_expire_hours: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub auth_token: Vec<String>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default = "default_sweep_interval_secs")]
    pub cache_sweep_interval_secs: u64,
    #[serde(default)]
    pub models: Vec<ModelConfig>,
}

impl GatewayConfig {
    /// Load from a TOML file, then apply `POLYGLOT__*` environment overrides
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            anyhow::bail!("config file not found: {}", path.display());
        }

        let config: Self = ::config::Config::builder()
            .add_source(::config::File::from(path).required(true))
            .add_source(::config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .with_context(|| format!("failed to read config file {}", path.display()))?
            .try_deserialize()
            .with_context(|| format!("failed to decode config file {}", path.display()))?;

        config.validate()?;
        info!(
            path = %path.display(),
            models = config.models.len(),
            "config loaded"
        );
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.host.trim().is_empty() {
            return Err(anyhow::anyhow!("host is required"));
        }

        if self.port == 0 {
            return Err(anyhow::anyhow!("invalid port: {}", self.port));
        }

        if self.auth_token.is_empty() {
            warn!("No auth tokens configured, every /api/v1 request will be rejected");
        }

        if self.models.is_empty() {
            warn!("No models configured");
        }

        for model in &self.models {
            model
                .validate()
                .with_context(|| format!("invalid model {:?}", model.name))?;
        }

        Ok(())
    }

    /// Validated backend definitions, one per configured model
    pub fn backend_configs(&self) -> anyhow::Result<Vec<BackendConfig>> {
        self.models.iter().map(ModelConfig::to_backend_config).collect()
    }

    /// Per-request deadline, if configured
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    pub fn cache_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.cache_sweep_interval_secs.max(1))
    }
}

impl ModelConfig {
    /// Validate one model entry
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.name.trim().is_empty() {
            return Err(anyhow::anyhow!("name is required"));
        }

        if self.base_url.trim().is_empty() {
            return Err(anyhow::anyhow!("base_url is required"));
        }

        self.provider_kind()?;

        if self.api_key.is_empty() {
            return Err(anyhow::anyhow!("api_key is required"));
        }

        if self.model_name.trim().is_empty() {
            return Err(anyhow::anyhow!("model_name is required"));
        }

        if self.max_tokens == 0 {
            return Err(anyhow::anyhow!("max_tokens must be greater than 0"));
        }

        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(anyhow::anyhow!(
                "temperature must be between 0 and 1, got {}",
                self.temperature
            ));
        }

        PromptTemplate::parse(self.prompt.as_str())?;

        AdmissionController::new(self.rate_limit)?;

        let route = normalize_route(&self.endpoint);
        if route.is_empty() {
            return Err(anyhow::anyhow!("endpoint is required"));
        }
        if route.contains('/') {
            return Err(anyhow::anyhow!(
                "endpoint must be a single path segment, got {:?}",
                self.endpoint
            ));
        }

        if self.cache_expire_hours == 0 {
            return Err(anyhow::anyhow!("cache_expire_hours must be greater than 0"));
        }
        if self.cache_expire_hours > MAX_CACHE_EXPIRE_HOURS {
            return Err(anyhow::anyhow!(
                "cache_expire_hours must be at most {}, got {}",
                MAX_CACHE_EXPIRE_HOURS,
                self.cache_expire_hours
            ));
        }

        if self.timeout_secs == 0 {
            return Err(anyhow::anyhow!("timeout_secs must be greater than 0"));
        }

        Ok(())
    }

    fn provider_kind(&self) -> anyhow::Result<ProviderKind> {
        match self.provider.as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            other => Err(anyhow::anyhow!("unsupported model type: {:?}", other)),
        }
    }

    /// Convert into the immutable form backends are built from
    pub fn to_backend_config(&self) -> anyhow::Result<BackendConfig> {
        self.validate()
            .with_context(|| format!("invalid model {:?}", self.name))?;

        Ok(BackendConfig {
            name: self.name.clone(),
            endpoint: normalize_route(&self.endpoint).to_string(),
            base_url: self.base_url.clone(),
            provider: self.provider_kind()?,
            api_key: self.api_key.clone(),
            model_name: self.model_name.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            prompt: PromptTemplate::parse(self.prompt.as_str())?,
            rate_limit: self.rate_limit,
            cache_ttl: Duration::from_secs(self.cache_expire_hours * 3600),
            timeout: Duration::from_secs(self.timeout_secs),
        })
    }
}
