//! Bearer-token authentication for the native `/api/v1` routes

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::core::errors::TranslationError;
use crate::server::api::AppState;

/// Token from an `Authorization: Bearer <token>` header value
pub fn bearer_token(header: &str) -> Option<&str> {
    header.strip_prefix("Bearer ").filter(|token| !token.is_empty())
}

/// Whether `token` is in the allow-list, compared in constant time
pub fn is_allowed(allowed: &[String], token: &str) -> bool {
    allowed
        .iter()
        .any(|candidate| bool::from(candidate.as_bytes().ct_eq(token.as_bytes())))
}

/// Reject requests whose bearer token is missing or not allow-listed,
/// before any backend is touched.
pub async fn require_bearer(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, TranslationError> {
    let authorized = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token)
        .is_some_and(|token| is_allowed(&state.auth_tokens, token));

    if !authorized {
        warn!(path = %request.uri().path(), "unauthorized request");
        return Err(TranslationError::Unauthorized);
    }
    Ok(next.run(request).await)
}
