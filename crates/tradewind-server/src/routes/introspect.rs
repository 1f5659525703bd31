//! Token introspection endpoint handler.
//!
//! Handles `POST /oauth/introspect`. Unknown, revoked and expired tokens
//! all report a bare `{"active": false}`.

use axum::{Form, Json, extract::State, http::StatusCode, response::{IntoResponse, Response}};
use serde::Deserialize;
use tracing::debug;

use tradewind_auth::introspection::IntrospectionRequest;

use crate::state::AppState;

/// Form parameters for the introspection endpoint.
#[derive(Debug, Deserialize)]
pub struct IntrospectionForm {
    /// The token to introspect.
    #[serde(default)]
    pub token: String,
}

/// Introspection endpoint handler.
pub async fn introspect_handler(
    State(state): State<AppState>,
    Form(form): Form<IntrospectionForm>,
) -> Response {
    if form.token.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "invalid_request" })),
        )
            .into_response();
    }

    let request = IntrospectionRequest { token: form.token };
    match state.introspection.introspect(&request).await {
        Ok(response) => {
            debug!(active = response.active, "Token introspection completed");
            (StatusCode::OK, Json(response)).into_response()
        }
        // Store failure: fail the request, not the process.
        Err(e) => e.into_response(),
    }
}
