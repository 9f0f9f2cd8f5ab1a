//! Authentication middleware for protected endpoints.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

/// Extractor for the operator token from config.
#[derive(Clone)]
pub struct OperatorToken(pub Arc<String>);

/// Extractor for the shared vehicle token from config.
#[derive(Clone)]
pub struct DroneToken(pub Arc<String>);

/// Middleware that requires the operator token in the Authorization header.
///
/// Expected header format: `Authorization: Bearer <operator_token>`
pub async fn require_operator(
    State(operator_token): State<OperatorToken>,
    request: Request,
    next: Next,
) -> Response {
    match extract_bearer(request.headers()) {
        Some(token) if token == *operator_token.0 => next.run(request).await,
        Some(_) => (
            StatusCode::FORBIDDEN,
            Json(serde_json::json!({
                "error": "Invalid operator token",
                "hint": "Check OPCON_OPERATOR_TOKEN environment variable"
            })),
        )
            .into_response(),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({
                "error": "Authorization required",
                "hint": "Add header: Authorization: Bearer <operator_token>"
            })),
        )
            .into_response(),
    }
}

/// Middleware that requires the shared vehicle token.
///
/// Accepts `X-Drone-Token: <token>` or `Authorization: Bearer <token>`.
pub async fn require_drone(
    State(drone_token): State<DroneToken>,
    request: Request,
    next: Next,
) -> Response {
    match extract_drone_token(request.headers()) {
        Some(token) if token == *drone_token.0 => next.run(request).await,
        Some(_) => (
            StatusCode::FORBIDDEN,
            Json(serde_json::json!({
                "error": "Invalid drone token"
            })),
        )
            .into_response(),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({
                "error": "Drone token required",
                "hint": "Set X-Drone-Token header"
            })),
        )
            .into_response(),
    }
}

/// Extract a bearer token from the Authorization header.
pub fn extract_bearer(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Extract the vehicle token from headers.
/// Accepts `X-Drone-Token: <token>` or `Authorization: Bearer <token>`.
pub fn extract_drone_token(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers.get("X-Drone-Token") {
        if let Ok(token) = value.to_str() {
            let token = token.trim();
            if !token.is_empty() {
                return Some(token.to_string());
            }
        }
    }
    extract_bearer(headers)
}
