//! HTTP API server implementation

use axum::{
    extract::{rejection::JsonRejection, Json, Path, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info};

use crate::core::config::GatewayConfig;
use crate::core::errors::TranslationError;
use crate::core::registry::Registry;
use crate::server::adapters::{
    DeepLxRequest, DeepLxResponse, HcfyRequest, HcfyResponse, ModelsResponse,
    NamedTranslateRequest, RoutedTranslateRequest, TranslateResponse,
};
use crate::server::auth::require_bearer;
use crate::server::dispatch::Dispatcher;

/// Application state
#[derive(Debug, Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub auth_tokens: Vec<String>,
}

impl AppState {
    pub fn new(registry: Arc<Registry>, auth_tokens: Vec<String>, request_timeout: Option<Duration>) -> Self {
        Self {
            dispatcher: Dispatcher::new(registry, request_timeout),
            auth_tokens,
        }
    }
}

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    service: String,
    version: String,
}

impl IntoResponse for TranslationError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            TranslationError::ValidationError { .. } => (StatusCode::BAD_REQUEST, self.to_string()),
            TranslationError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            TranslationError::BackendNotFound { .. } => {
                (StatusCode::NOT_FOUND, "Client not found".to_string())
            }
            TranslationError::RateLimited { .. } => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Rate limited, retry later".to_string(),
            ),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error translating text".to_string(),
            ),
        };

        if self.is_client_error() {
            debug!(error = %self, status = status.as_u16(), "rejected request");
        }

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

fn invalid_body(rejection: JsonRejection) -> TranslationError {
    TranslationError::invalid(rejection.body_text())
}

/// Health check handler
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// List backends by name and by route
async fn list_models(State(state): State<Arc<AppState>>) -> Json<ModelsResponse> {
    let registry = state.dispatcher.registry();
    Json(ModelsResponse {
        models_by_name: registry.list_names(),
        models_by_endpoint: registry.list_routes(),
    })
}

/// Native translation with the backend named in the body
async fn translate_by_name(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NamedTranslateRequest>, JsonRejection>,
) -> Result<Json<TranslateResponse>, TranslationError> {
    let Json(payload) = payload.map_err(invalid_body)?;
    let request = payload.into_request()?;
    let completion = state.dispatcher.dispatch(&request).await?;

    Ok(Json(TranslateResponse {
        model_name: completion.backend.name().to_string(),
        translated_text: completion.text,
    }))
}

/// Native translation with the backend taken from the URL
async fn translate_by_route(
    State(state): State<Arc<AppState>>,
    Path(route): Path<String>,
    payload: Result<Json<RoutedTranslateRequest>, JsonRejection>,
) -> Result<Json<TranslateResponse>, TranslationError> {
    let Json(payload) = payload.map_err(invalid_body)?;
    let request = payload.into_request(&route)?;
    let completion = state.dispatcher.dispatch(&request).await?;

    Ok(Json(TranslateResponse {
        model_name: completion.backend.model_name().to_string(),
        translated_text: completion.text,
    }))
}

/// hcfy browser-extension handler
async fn hcfy(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<HcfyRequest>, JsonRejection>,
) -> Result<Json<HcfyResponse>, TranslationError> {
    let Json(payload) = payload.map_err(invalid_body)?;
    let request = payload.into_request()?;
    let completion = state.dispatcher.dispatch(&request).await?;

    Ok(Json(HcfyResponse::new(&request, completion.text)))
}

/// DeepL-compatible handler
async fn deeplx(
    State(state): State<Arc<AppState>>,
    Path(route): Path<String>,
    payload: Result<Json<DeepLxRequest>, JsonRejection>,
) -> Result<Json<DeepLxResponse>, TranslationError> {
    let Json(payload) = payload.map_err(invalid_body)?;
    let call = payload.into_call(&route)?;
    let completion = state.dispatcher.dispatch(&call.request).await?;

    Ok(Json(DeepLxResponse::success(call, completion.text)))
}

/// Build the gateway router
pub fn router(state: Arc<AppState>) -> Router {
    let v1 = Router::new()
        .route("/translate", post(translate_by_name))
        .route("/models", get(list_models))
        .route("/models/", get(list_models))
        .route("/models/:route", post(translate_by_route))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer));

    Router::new()
        .route("/api/health", get(health_check))
        .nest("/api/v1", v1)
        .route("/api/hcfy", post(hcfy))
        .route("/api/deeplx/:route", post(deeplx))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Periodically drop expired entries from every backend's cache
pub fn spawn_cache_sweeper(registry: Arc<Registry>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed: usize = registry
                .backends()
                .iter()
                .map(|backend| backend.cache().purge_expired())
                .sum();
            debug!(removed, "cache sweep finished");
        }
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Run the HTTP server
pub async fn run_server(config: GatewayConfig) -> anyhow::Result<()> {
    let registry = Arc::new(Registry::from_configs(config.backend_configs()?)?);

    for route in registry.list_routes() {
        info!("Serving backend on /api/v1/models/{} and /api/deeplx/{}", route, route);
    }

    let sweeper = spawn_cache_sweeper(registry.clone(), config.cache_sweep_interval());
    let state = Arc::new(AppState::new(
        registry,
        config.auth_token.clone(),
        config.request_timeout(),
    ));
    let app = router(state);

    // Bind address
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    Ok(())
}
