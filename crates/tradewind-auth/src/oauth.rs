//! Token endpoint wire types.
//!
//! Request parsing, response generation and error bodies for the
//! form-encoded `/oauth/token` endpoint.
//!
//! # Supported Grant Types
//!
//! - `password` - Resource-owner password credentials
//! - `client_credentials` - Machine-to-machine authentication

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::AuthError;

/// Token request parameters.
///
/// Different fields are required depending on `grant_type`:
///
/// - `password`: username, password
/// - `client_credentials`: client credentials only
///
/// Clients authenticate with HTTP Basic auth (not in this struct) or
/// `client_id` + `client_secret` in the body.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenRequest {
    /// OAuth 2.0 grant type. One of: "password", "client_credentials".
    pub grant_type: String,

    /// Client id (for client_secret_post authentication).
    #[serde(default)]
    pub client_id: Option<String>,

    /// Client secret (for client_secret_post authentication).
    #[serde(default)]
    pub client_secret: Option<String>,

    /// Username (for the password grant).
    #[serde(default)]
    pub username: Option<String>,

    /// Password (for the password grant).
    #[serde(default)]
    pub password: Option<String>,

    /// Requested scope.
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenRequest {
    /// Creates a password-grant request.
    #[must_use]
    pub fn password(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            grant_type: "password".to_string(),
            client_id: None,
            client_secret: None,
            username: Some(username.into()),
            password: Some(password.into()),
            scope: None,
        }
    }

    /// Creates a client-credentials request.
    #[must_use]
    pub fn client_credentials() -> Self {
        Self {
            grant_type: "client_credentials".to_string(),
            client_id: None,
            client_secret: None,
            username: None,
            password: None,
            scope: None,
        }
    }
}

/// Successful token response.
///
/// # Example Response
///
/// ```json
/// {
///   "access_token": "eyJhbG...",
///   "token_type": "Bearer",
///   "expires_in": 3600,
///   "scope": "default",
///   "refresh_token": "5f7a..."
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    /// The access token (signed claim set).
    pub access_token: String,

    /// Token type, always "Bearer".
    pub token_type: String,

    /// Access token lifetime in seconds.
    pub expires_in: u64,

    /// Granted scope (space-separated).
    pub scope: String,

    /// Refresh token (opaque, present when refresh is enabled).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl TokenResponse {
    /// Creates a new token response with required fields.
    #[must_use]
    pub fn new(access_token: String, expires_in: u64, scope: String) -> Self {
        Self {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in,
            scope,
            refresh_token: None,
        }
    }

    /// Sets the refresh token.
    #[must_use]
    pub fn with_refresh_token(mut self, token: String) -> Self {
        self.refresh_token = Some(token);
        self
    }
}

/// Token error response per RFC 6749 §5.2.
#[derive(Debug, Clone, Serialize)]
pub struct TokenError {
    /// OAuth 2.0 error code.
    pub error: TokenErrorCode,

    /// Human-readable error description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

impl TokenError {
    /// Creates a new token error.
    #[must_use]
    pub fn new(error: TokenErrorCode) -> Self {
        Self {
            error,
            error_description: None,
        }
    }

    /// Creates a new token error with description.
    #[must_use]
    pub fn with_description(error: TokenErrorCode, description: impl Into<String>) -> Self {
        Self {
            error,
            error_description: Some(description.into()),
        }
    }

    /// Maps an [`AuthError`] to the wire error body.
    ///
    /// Server-side failures collapse to a generic `server_error` so that
    /// internal detail never leaks to clients.
    #[must_use]
    pub fn from_auth_error(error: &AuthError) -> Self {
        let code = match error {
            AuthError::InvalidClient { .. } => TokenErrorCode::InvalidClient,
            AuthError::InvalidGrant { .. } => TokenErrorCode::InvalidGrant,
            AuthError::UnsupportedGrantType { .. } => TokenErrorCode::UnsupportedGrantType,
            AuthError::InvalidRequest { .. } => TokenErrorCode::InvalidRequest,
            _ => TokenErrorCode::ServerError,
        };
        if code == TokenErrorCode::ServerError {
            Self::new(code)
        } else {
            Self::with_description(code, error.to_string())
        }
    }
}

/// OAuth 2.0 token error codes (RFC 6749 §5.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenErrorCode {
    /// The request is missing a required parameter or is otherwise malformed.
    InvalidRequest,

    /// Client authentication failed.
    InvalidClient,

    /// The provided authorization grant is invalid.
    InvalidGrant,

    /// The authorization grant type is not supported.
    UnsupportedGrantType,

    /// The authorization server encountered an unexpected condition.
    ServerError,
}

impl TokenErrorCode {
    /// Returns the string representation of the error code.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::InvalidClient => "invalid_client",
            Self::InvalidGrant => "invalid_grant",
            Self::UnsupportedGrantType => "unsupported_grant_type",
            Self::ServerError => "server_error",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidClient | Self::InvalidGrant => 401,
            Self::InvalidRequest | Self::UnsupportedGrantType => 400,
            Self::ServerError => 500,
        }
    }
}

impl fmt::Display for TokenErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_request_password_grant() {
        let body = "grant_type=password&client_id=webclient&client_secret=s&username=alice&password=pw123";
        let request: TokenRequest = serde_urlencoded_from_str(body);
        assert_eq!(request.grant_type, "password");
        assert_eq!(request.username, Some("alice".to_string()));
        assert_eq!(request.password, Some("pw123".to_string()));
        assert_eq!(request.client_id, Some("webclient".to_string()));
    }

    #[test]
    fn test_token_request_client_credentials() {
        let json = r#"{
            "grant_type": "client_credentials",
            "client_id": "trades-service",
            "client_secret": "secret123"
        }"#;

        let request: TokenRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.grant_type, "client_credentials");
        assert_eq!(request.client_id, Some("trades-service".to_string()));
        assert!(request.username.is_none());
    }

    #[test]
    fn test_token_response_serialization() {
        let response =
            TokenResponse::new("token-value".to_string(), 3600, "default".to_string());

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains(r#""access_token":"token-value""#));
        assert!(json.contains(r#""token_type":"Bearer""#));
        assert!(json.contains(r#""expires_in":3600"#));
        assert!(!json.contains("refresh_token"));

        let with_refresh = TokenResponse::new("t".to_string(), 60, "default".to_string())
            .with_refresh_token("refresh-value".to_string());
        let json = serde_json::to_string(&with_refresh).unwrap();
        assert!(json.contains(r#""refresh_token":"refresh-value""#));
    }

    #[test]
    fn test_token_error_from_auth_error() {
        let err = TokenError::from_auth_error(&AuthError::invalid_client("unknown client"));
        assert_eq!(err.error, TokenErrorCode::InvalidClient);

        let err = TokenError::from_auth_error(&AuthError::invalid_grant("bad credentials"));
        assert_eq!(err.error, TokenErrorCode::InvalidGrant);

        // Internal detail is not echoed to clients.
        let err = TokenError::from_auth_error(&AuthError::internal("signing key exploded"));
        assert_eq!(err.error, TokenErrorCode::ServerError);
        assert!(err.error_description.is_none());
    }

    #[test]
    fn test_error_code_http_status() {
        assert_eq!(TokenErrorCode::InvalidRequest.http_status(), 400);
        assert_eq!(TokenErrorCode::InvalidClient.http_status(), 401);
        assert_eq!(TokenErrorCode::InvalidGrant.http_status(), 401);
        assert_eq!(TokenErrorCode::UnsupportedGrantType.http_status(), 400);
        assert_eq!(TokenErrorCode::ServerError.http_status(), 500);
    }

    /// Minimal form decoding for tests without pulling in serde_urlencoded.
    fn serde_urlencoded_from_str(body: &str) -> TokenRequest {
        let mut map = serde_json::Map::new();
        for pair in body.split('&') {
            if let Some((k, v)) = pair.split_once('=') {
                map.insert(k.to_string(), serde_json::Value::String(v.to_string()));
            }
        }
        serde_json::from_value(serde_json::Value::Object(map)).unwrap()
    }
}
