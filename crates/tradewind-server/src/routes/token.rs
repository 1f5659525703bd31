//! Token endpoint handler.
//!
//! Handles `POST /oauth/token` with an `application/x-www-form-urlencoded`
//! body. Supported grant types:
//!
//! - `password` - resource-owner password credentials
//! - `client_credentials` - machine-to-machine authentication
//!
//! # Client Authentication
//!
//! Clients authenticate with either:
//! - HTTP Basic auth: `Authorization: Basic <base64(client_id:client_secret)>`
//! - Request body: `client_id` and `client_secret` parameters

use axum::{
    Form, Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use base64::Engine;
use tracing::{debug, info, warn};

use tradewind_auth::error::AuthError;
use tradewind_auth::oauth::{TokenError, TokenRequest, TokenResponse};
use tradewind_auth::store::ClientStore;
use tradewind_auth::types::Client;

use crate::state::AppState;

/// Token endpoint handler.
pub async fn token_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(request): Form<TokenRequest>,
) -> Response {
    debug!(
        grant_type = %request.grant_type,
        client_id = ?request.client_id,
        "Processing token request"
    );

    let client = match authenticate_client(state.clients.as_ref(), &headers, &request).await {
        Ok(client) => client,
        Err(e) => {
            warn!(error = %e, "Client authentication failed");
            return token_error_response(&e);
        }
    };

    let result = match request.grant_type.as_str() {
        "password" => state.issuer.password_grant(&request, &client).await,
        "client_credentials" => {
            state
                .issuer
                .client_credentials_grant(&request, &client)
                .await
        }
        other => {
            warn!(grant_type = other, "Unsupported grant type");
            Err(AuthError::unsupported_grant_type(other))
        }
    };

    match result {
        Ok(response) => {
            info!(
                client_id = %client.client_id,
                grant_type = %request.grant_type,
                "Token issued"
            );
            token_success_response(response)
        }
        Err(e) => {
            warn!(
                client_id = %client.client_id,
                grant_type = %request.grant_type,
                error = %e,
                "Token request failed"
            );
            token_error_response(&e)
        }
    }
}

/// Client authentication credentials extracted from the request.
enum ClientAuth {
    /// HTTP Basic authentication.
    Basic {
        client_id: String,
        client_secret: String,
    },
    /// Client credentials in the request body.
    Body {
        client_id: String,
        client_secret: String,
    },
    /// No client credentials provided.
    None,
}

/// Extracts client authentication from headers and request body.
fn extract_client_auth(headers: &HeaderMap, request: &TokenRequest) -> ClientAuth {
    if let Some(auth_header) = headers.get("authorization") {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(basic) = auth_str.strip_prefix("Basic ") {
                if let Ok(decoded) = base64::engine::general_purpose::STANDARD.decode(basic.trim())
                {
                    if let Ok(creds) = String::from_utf8(decoded) {
                        if let Some((client_id, client_secret)) = creds.split_once(':') {
                            return ClientAuth::Basic {
                                client_id: client_id.to_string(),
                                client_secret: client_secret.to_string(),
                            };
                        }
                    }
                }
            }
        }
    }

    if let (Some(client_id), Some(client_secret)) =
        (request.client_id.as_ref(), request.client_secret.as_ref())
    {
        return ClientAuth::Body {
            client_id: client_id.clone(),
            client_secret: client_secret.clone(),
        };
    }

    ClientAuth::None
}

/// Authenticates the requesting client against the client store.
async fn authenticate_client(
    clients: &dyn ClientStore,
    headers: &HeaderMap,
    request: &TokenRequest,
) -> Result<Client, AuthError> {
    let (client_id, secret) = match extract_client_auth(headers, request) {
        ClientAuth::Basic {
            client_id,
            client_secret,
        }
        | ClientAuth::Body {
            client_id,
            client_secret,
        } => (client_id, client_secret),
        ClientAuth::None => {
            return Err(AuthError::invalid_client("no client credentials provided"));
        }
    };

    let client = clients
        .find_by_client_id(&client_id)
        .await?
        .filter(Client::is_active)
        .ok_or_else(|| AuthError::invalid_client("client authentication failed"))?;

    if !clients.verify_secret(&client_id, &secret).await? {
        return Err(AuthError::invalid_client("client authentication failed"));
    }

    Ok(client)
}

/// Builds a successful token response.
fn token_success_response(response: TokenResponse) -> Response {
    (
        StatusCode::OK,
        [
            ("Cache-Control", "no-store"),
            ("Pragma", "no-cache"),
        ],
        Json(response),
    )
        .into_response()
}

/// Builds an error response for the token endpoint.
fn token_error_response(error: &AuthError) -> Response {
    let body = TokenError::from_auth_error(error);
    let status =
        StatusCode::from_u16(body.error.http_status()).unwrap_or(StatusCode::BAD_REQUEST);

    (
        status,
        [
            ("Cache-Control", "no-store"),
            ("Pragma", "no-cache"),
        ],
        Json(body),
    )
        .into_response()
}
