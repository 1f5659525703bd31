//! Token revocation endpoint handler.
//!
//! Handles `POST /oauth/revoke`. Per the idempotent-revocation contract
//! the endpoint returns 200 OK whether or not a record existed; only a
//! missing `token` parameter is a client error.

use axum::{
    Form, Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::warn;

use tradewind_auth::revocation::{RevocationRequest, TokenTypeHint};

use crate::state::AppState;

/// Form parameters for the revocation endpoint.
#[derive(Debug, Deserialize)]
pub struct RevocationForm {
    /// The token to revoke.
    #[serde(default)]
    pub token: String,

    /// Optional hint about the token type. Unknown hints are ignored.
    #[serde(default)]
    pub token_type_hint: Option<String>,
}

/// Revocation endpoint handler.
pub async fn revoke_handler(
    State(state): State<AppState>,
    Form(form): Form<RevocationForm>,
) -> Response {
    if form.token.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "invalid_request" })),
        )
            .into_response();
    }

    let request = RevocationRequest {
        token: form.token,
        token_type_hint: form.token_type_hint.as_deref().and_then(TokenTypeHint::parse),
    };

    // Always 200, even when the store hiccups: revocation must never
    // reveal whether a token existed.
    if let Err(e) = state.revocation.revoke(&request).await {
        warn!(error = %e, "Revocation encountered a store error (returning 200)");
    }

    StatusCode::OK.into_response()
}
