//! HTTP route wiring for the credential service.

pub mod account;
pub mod introspect;
pub mod revoke;
pub mod token;

use axum::{
    Json, Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Builds the credential service router.
#[must_use]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/oauth/token", post(token::token_handler))
        .route("/oauth/revoke", post(revoke::revoke_handler))
        .route("/oauth/introspect", post(introspect::introspect_handler))
        .route("/auth/register", post(account::register_handler))
        .route("/auth/me", get(account::me_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check.
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
