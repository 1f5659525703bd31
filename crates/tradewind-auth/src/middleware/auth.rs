//! Bearer token validation extractor.
//!
//! This module provides the axum extractor that runs the validation
//! pipeline on every protected request.
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, routing::get};
//! use tradewind_auth::middleware::{BearerAuth, ValidatorState};
//!
//! async fn protected_handler(BearerAuth(auth): BearerAuth) -> String {
//!     format!("Hello, {}!", auth.subject())
//! }
//!
//! let app = Router::new()
//!     .route("/protected", get(protected_handler))
//!     .with_state(validator_state);
//! ```

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::codec::{AccessTokenClaims, CodecError, TokenCodec};
use crate::error::AuthError;
use crate::introspection::IntrospectionClient;

use super::context::AuthContext;

// =============================================================================
// Validator State
// =============================================================================

/// State required to validate bearer tokens.
///
/// Include this in the application state and expose it to the
/// [`BearerAuth`] extractor via `FromRef`.
#[derive(Clone)]
pub struct ValidatorState {
    /// Codec for the local signature and expiry check.
    pub codec: Arc<TokenCodec>,

    /// Client for the issuer's introspection endpoint.
    pub introspection: IntrospectionClient,

    /// This service's own client identifier; tokens minted for any other
    /// audience are rejected.
    pub expected_audience: String,
}

impl ValidatorState {
    /// Creates a new validator state.
    #[must_use]
    pub fn new(
        codec: Arc<TokenCodec>,
        introspection: IntrospectionClient,
        expected_audience: impl Into<String>,
    ) -> Self {
        Self {
            codec,
            introspection,
            expected_audience: expected_audience.into(),
        }
    }
}

// =============================================================================
// Bearer Auth Extractor
// =============================================================================

/// Axum extractor that validates bearer tokens and yields the caller's
/// [`AuthContext`].
///
/// The checks run in order and short-circuit on first failure:
///
/// 1. `Authorization: Bearer <token>` header parse (missing/malformed → 401)
/// 2. Codec verification (bad signature or expired → 401, no network call)
/// 3. Remote liveness via introspection (inactive → 401; endpoint
///    unreachable → 503, fail closed)
/// 4. Audience equality (mismatch → 403)
///
/// No introspection result is cached beyond this single validation pass.
#[derive(Debug)]
pub struct BearerAuth(pub AuthContext);

impl<S> FromRequestParts<S> for BearerAuth
where
    S: Send + Sync,
    ValidatorState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let validator = ValidatorState::from_ref(state);

        // 1. Extract the bearer token from the Authorization header.
        let token = bearer_token(parts)?;

        // 2. Local verification: signature and expiry, no network.
        let claims = verify_locally(&validator.codec, token)?;

        // 3. Liveness: the only way to learn that a valid-by-signature
        //    token has been revoked. A transport failure is not a verdict.
        let liveness = validator.introspection.introspect(token).await?;
        if !liveness.active {
            tracing::debug!(jti = %claims.jti, "Token reported inactive");
            return Err(AuthError::TokenInactive);
        }

        // 4. Audience: reject tokens minted for another relying service.
        if claims.aud != validator.expected_audience {
            tracing::warn!(
                audience = %claims.aud,
                expected = %validator.expected_audience,
                "Token audience mismatch"
            );
            return Err(AuthError::wrong_audience(claims.aud));
        }

        let context = AuthContext::new(claims);
        tracing::debug!(
            subject = %context.subject(),
            is_user = context.is_user(),
            "Token validated"
        );
        Ok(BearerAuth(context))
    }
}

/// Extracts the bearer token from the Authorization header.
fn bearer_token(parts: &Parts) -> Result<&str, AuthError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AuthError::unauthorized("missing Authorization header"))?;

    header
        .strip_prefix("Bearer ")
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AuthError::unauthorized("Authorization format must be Bearer <token>"))
}

/// Runs the codec check, mapping codec errors to their pipeline outcomes.
fn verify_locally(codec: &TokenCodec, token: &str) -> Result<AccessTokenClaims, AuthError> {
    codec.verify(token).map_err(|e| match e {
        CodecError::Expired => AuthError::TokenExpired,
        CodecError::InvalidSignature => {
            tracing::debug!("Token signature verification failed");
            AuthError::invalid_token("signature verification failed")
        }
        other => {
            tracing::debug!(error = %other, "Token rejected by codec");
            AuthError::invalid_token("malformed token")
        }
    })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use std::time::Duration as StdDuration;
    use time::OffsetDateTime;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SECRET: &[u8] = b"pipeline-test-secret";
    const ISSUER: &str = "https://auth.tradewind.test";

    fn codec() -> Arc<TokenCodec> {
        Arc::new(TokenCodec::new(SECRET, ISSUER))
    }

    fn signed_token(codec: &TokenCodec, audience: &str) -> String {
        let claims = AccessTokenClaims::builder(ISSUER, "user-1", audience)
            .scope("trade")
            .username("alice")
            .expires_in_seconds(3600)
            .build();
        codec.sign(&claims).unwrap()
    }

    fn state(codec: Arc<TokenCodec>, introspect_url: &str) -> ValidatorState {
        let client =
            IntrospectionClient::new(introspect_url, StdDuration::from_secs(1)).unwrap();
        ValidatorState::new(codec, client, "trades-service")
    }

    fn parts_with_header(value: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/protected");
        if let Some(v) = value {
            builder = builder.header(AUTHORIZATION, v);
        }
        let (parts, ()) = builder.body(()).unwrap().into_parts();
        parts
    }

    async fn mock_introspection(active: bool) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/introspect"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "active": active })),
            )
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_valid_token_yields_context() {
        let codec = codec();
        let token = signed_token(&codec, "trades-service");
        let server = mock_introspection(true).await;
        let state = state(codec, &format!("{}/oauth/introspect", server.uri()));

        let mut parts = parts_with_header(Some(&format!("Bearer {token}")));
        let BearerAuth(ctx) = BearerAuth::from_request_parts(&mut parts, &state)
            .await
            .unwrap();

        assert_eq!(ctx.subject(), "user-1");
        assert_eq!(ctx.username(), Some("alice"));
    }

    #[tokio::test]
    async fn test_missing_header_rejected() {
        let server = mock_introspection(true).await;
        let state = state(codec(), &format!("{}/oauth/introspect", server.uri()));

        let mut parts = parts_with_header(None);
        let err = BearerAuth::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Unauthorized { .. }));
    }

    #[tokio::test]
    async fn test_malformed_header_rejected() {
        let server = mock_introspection(true).await;
        let state = state(codec(), &format!("{}/oauth/introspect", server.uri()));

        let mut parts = parts_with_header(Some("Basic dXNlcjpwYXNz"));
        let err = BearerAuth::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Unauthorized { .. }));
    }

    #[tokio::test]
    async fn test_wrong_key_rejected_before_any_network_call() {
        // Introspection would fail loudly if called; the signature check
        // must short-circuit first.
        let unreachable = "http://127.0.0.1:1/oauth/introspect";
        let state = state(codec(), unreachable);

        let other_codec = TokenCodec::new(b"some-other-secret", ISSUER);
        let token = signed_token(&other_codec, "trades-service");

        let mut parts = parts_with_header(Some(&format!("Bearer {token}")));
        let err = BearerAuth::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken { .. }));
    }

    #[tokio::test]
    async fn test_expired_token_rejected_locally() {
        let unreachable = "http://127.0.0.1:1/oauth/introspect";
        let codec = codec();
        let state = state(Arc::clone(&codec), unreachable);

        let now = OffsetDateTime::now_utc().unix_timestamp();
        let claims = AccessTokenClaims::builder(ISSUER, "user-1", "trades-service")
            .issued_at(now - 7200)
            .expires_in_seconds(3600)
            .build();
        let token = codec.sign(&claims).unwrap();

        let mut parts = parts_with_header(Some(&format!("Bearer {token}")));
        let err = BearerAuth::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::TokenExpired));
    }

    #[tokio::test]
    async fn test_inactive_token_rejected() {
        let codec = codec();
        let token = signed_token(&codec, "trades-service");
        let server = mock_introspection(false).await;
        let state = state(codec, &format!("{}/oauth/introspect", server.uri()));

        let mut parts = parts_with_header(Some(&format!("Bearer {token}")));
        let err = BearerAuth::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::TokenInactive));
    }

    #[tokio::test]
    async fn test_unreachable_introspection_fails_closed() {
        let codec = codec();
        let token = signed_token(&codec, "trades-service");
        let state = state(codec, "http://127.0.0.1:1/oauth/introspect");

        let mut parts = parts_with_header(Some(&format!("Bearer {token}")));
        let err = BearerAuth::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Upstream { .. }));
    }

    #[tokio::test]
    async fn test_wrong_audience_rejected_even_when_active() {
        let codec = codec();
        // Token minted for the quotes service, presented to trades.
        let token = signed_token(&codec, "quotes-service");
        let server = mock_introspection(true).await;
        let state = state(codec, &format!("{}/oauth/introspect", server.uri()));

        let mut parts = parts_with_header(Some(&format!("Bearer {token}")));
        let err = BearerAuth::from_request_parts(&mut parts, &state)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::WrongAudience { .. }));
    }

    #[tokio::test]
    async fn test_introspection_called_with_presented_token() {
        let codec = codec();
        let token = signed_token(&codec, "trades-service");

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/introspect"))
            .and(body_string_contains("token="))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "active": true })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let state = state(codec, &format!("{}/oauth/introspect", server.uri()));
        let mut parts = parts_with_header(Some(&format!("Bearer {token}")));
        BearerAuth::from_request_parts(&mut parts, &state)
            .await
            .unwrap();
    }
}
