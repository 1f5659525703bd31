//! Error response handling for the validation pipeline.
//!
//! Implements `IntoResponse` for `AuthError` so that extractor rejections
//! surface as HTTP status codes with minimal, non-leaking bodies.

use axum::{
    Json,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::error::AuthError;

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, oauth_error, message) = error_details(&self);

        let body = json!({
            "error": oauth_error,
            "error_description": message,
        });

        let mut headers = HeaderMap::new();
        if status == StatusCode::UNAUTHORIZED {
            let www_auth = build_www_authenticate_header(oauth_error, &message);
            if let Ok(value) = HeaderValue::from_str(&www_auth) {
                headers.insert(header::WWW_AUTHENTICATE, value);
            }
        }

        (status, headers, Json(body)).into_response()
    }
}

/// Extracts response details from an `AuthError`.
///
/// Returns (HTTP status, OAuth error code, client-safe message). Server
/// failures collapse to fixed messages; internal detail stays in the logs.
fn error_details(error: &AuthError) -> (StatusCode, &'static str, String) {
    match error {
        AuthError::InvalidClient { message } => {
            (StatusCode::UNAUTHORIZED, "invalid_client", message.clone())
        }
        AuthError::InvalidGrant { message } => {
            (StatusCode::UNAUTHORIZED, "invalid_grant", message.clone())
        }
        AuthError::InvalidToken { message } => {
            (StatusCode::UNAUTHORIZED, "invalid_token", message.clone())
        }
        AuthError::TokenExpired => (
            StatusCode::UNAUTHORIZED,
            "invalid_token",
            "token has expired".to_string(),
        ),
        AuthError::TokenInactive => (
            StatusCode::UNAUTHORIZED,
            "invalid_token",
            "token is not active".to_string(),
        ),
        AuthError::WrongAudience { .. } => (
            StatusCode::FORBIDDEN,
            "access_denied",
            "token was issued for a different audience".to_string(),
        ),
        AuthError::Unauthorized { message } => {
            (StatusCode::UNAUTHORIZED, "unauthorized", message.clone())
        }
        AuthError::InvalidRequest { message } => {
            (StatusCode::BAD_REQUEST, "invalid_request", message.clone())
        }
        AuthError::UnsupportedGrantType { grant_type } => (
            StatusCode::BAD_REQUEST,
            "unsupported_grant_type",
            format!("unsupported grant type: {grant_type}"),
        ),
        AuthError::Upstream { .. } => (
            StatusCode::SERVICE_UNAVAILABLE,
            "server_error",
            "authorization check unavailable".to_string(),
        ),
        AuthError::Storage { .. } | AuthError::Configuration { .. } | AuthError::Internal { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "server_error",
            "internal server error".to_string(),
        ),
    }
}

/// Builds the WWW-Authenticate header value for 401 responses.
///
/// Format: `Bearer realm="tradewind", error="invalid_token", error_description="..."`
fn build_www_authenticate_header(error: &str, description: &str) -> String {
    let escaped = description.replace('\"', "\\\"");
    format!("Bearer realm=\"tradewind\", error=\"{error}\", error_description=\"{escaped}\"")
}
