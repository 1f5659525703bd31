//! User registration and the protected identity endpoint.

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::info;

use tradewind_auth::codec::CodecError;
use tradewind_auth::error::AuthError;
use tradewind_auth::secret::hash_secret;
use tradewind_auth::store::{TokenRecordStore, UserStore};
use tradewind_auth::types::User;

use crate::state::AppState;

// =============================================================================
// Registration
// =============================================================================

/// Registration request body.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    /// Desired username.
    pub username: String,
    /// Plaintext password; hashed before storage.
    pub password: String,
}

/// Registration response body.
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    /// Confirmation message.
    pub message: String,
}

/// Handles `POST /auth/register`.
pub async fn register_handler(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Response, AuthError> {
    if request.username.is_empty() || request.password.is_empty() {
        return Err(AuthError::invalid_request(
            "username and password are required",
        ));
    }

    let hash = hash_secret(&request.password)
        .map_err(|e| AuthError::internal(format!("password hashing failed: {e}")))?;
    let user = User::new(&request.username, hash);
    state.users.create(&user).await?;

    info!(username = %user.username, "User registered");
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "user registered".to_string(),
        }),
    )
        .into_response())
}

// =============================================================================
// Identity
// =============================================================================

/// Identity response body for `GET /auth/me`.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    /// The authenticated principal's identifier.
    pub user_id: String,
    /// Username, for human subjects.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// The client the token was issued to.
    pub client_id: String,
    /// Seconds until the token expires.
    pub expires_in: i64,
}

/// Handles `GET /auth/me`.
///
/// The credential service validates its own tokens directly: codec check
/// first, then record liveness straight from the store (it is the
/// issuer, so no remote introspection hop is involved).
pub async fn me_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<MeResponse>, AuthError> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AuthError::unauthorized("missing bearer token"))?;

    let claims = state.codec.verify(token).map_err(|e| match e {
        CodecError::Expired => AuthError::TokenExpired,
        CodecError::InvalidSignature => AuthError::invalid_token("signature verification failed"),
        _ => AuthError::invalid_token("malformed token"),
    })?;

    let now = OffsetDateTime::now_utc();
    let record = state
        .records
        .get_by_access(token)
        .await?
        .filter(|r| r.is_active_at(now))
        .ok_or(AuthError::TokenInactive)?;

    let expires_in = record.access_expires_at().unix_timestamp() - now.unix_timestamp();
    Ok(Json(MeResponse {
        user_id: claims.sub,
        username: claims.username,
        client_id: record.client_id,
        expires_in,
    }))
}
