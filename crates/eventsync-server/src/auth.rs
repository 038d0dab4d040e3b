//! Shared-secret guard for admin routes.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::ApiError;
use crate::AppState;

pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Middleware that admits only requests carrying the configured admin token.
///
/// Use with `axum::middleware::from_fn_with_state`.
pub async fn require_admin(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    match check_admin(state.admin_token.as_deref(), request.headers()) {
        Ok(()) => next.run(request).await,
        Err(e) => e.into_response(),
    }
}

fn check_admin(expected: Option<&str>, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(expected) = expected else {
        return Err(ApiError::Config("ADMIN_TOKEN is not set".to_string()));
    };

    let token = extract_token_from_header(headers)
        .or_else(|| extract_token_from_admin_header(headers))
        .ok_or_else(|| ApiError::Unauthorized("Missing admin token".to_string()))?;

    if token != expected {
        tracing::warn!("Rejected admin request with wrong token");
        return Err(ApiError::Forbidden("Invalid admin token".to_string()));
    }
    Ok(())
}

fn extract_token_from_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|s| s.to_string())
}

fn extract_token_from_admin_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get(ADMIN_TOKEN_HEADER)?
        .to_str()
        .ok()
        .map(|s| s.to_string())
}
