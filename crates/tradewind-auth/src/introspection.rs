//! Token introspection (RFC 7662 subset).
//!
//! Introspection is the authoritative liveness check: a token whose
//! signature still verifies reports `active: false` here as soon as its
//! record has been revoked or has expired. The issuer-side
//! [`IntrospectionService`] reads the token record store directly; remote
//! validators use [`IntrospectionClient`] to query the issuer over HTTP.
//!
//! # Security Considerations
//!
//! - Never reveal why a token is inactive (expired vs revoked vs unknown)
//! - An unreachable introspection endpoint is a failure, not a verdict

use std::time::Duration as StdDuration;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::AuthResult;
use crate::error::AuthError;
use crate::store::TokenRecordStore;

// =============================================================================
// Request / Response Types
// =============================================================================

/// Token introspection request.
#[derive(Debug, Clone, Deserialize)]
pub struct IntrospectionRequest {
    /// The token to introspect (access token value).
    pub token: String,
}

/// Token introspection response.
///
/// `active` is the only required field. When the token is unknown,
/// revoked or expired, the response carries `active: false` and nothing
/// else.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IntrospectionResponse {
    /// Whether the token is currently active.
    pub active: bool,

    /// Client identifier the token was issued to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// Subject identifier (user or client id).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Space-separated granted scope.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Issued-at time (Unix timestamp).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Expiration time (Unix timestamp).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

impl IntrospectionResponse {
    /// Creates an inactive response.
    ///
    /// Used for unknown, revoked and expired tokens alike; callers must
    /// not be able to tell the cases apart.
    #[must_use]
    pub fn inactive() -> Self {
        Self::default()
    }

    /// Creates an active response.
    #[must_use]
    pub fn active() -> Self {
        Self {
            active: true,
            ..Self::default()
        }
    }

    /// Sets the client id.
    #[must_use]
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Sets the subject.
    #[must_use]
    pub fn with_sub(mut self, sub: impl Into<String>) -> Self {
        self.sub = Some(sub.into());
        self
    }

    /// Sets the scope.
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Sets the issued-at time.
    #[must_use]
    pub fn with_iat(mut self, iat: i64) -> Self {
        self.iat = Some(iat);
        self
    }

    /// Sets the expiration time.
    #[must_use]
    pub fn with_exp(mut self, exp: i64) -> Self {
        self.exp = Some(exp);
        self
    }
}

// =============================================================================
// Issuer-side Service
// =============================================================================

/// Introspection against the local token record store.
///
/// Run by the credential service on behalf of remote callers.
pub struct IntrospectionService {
    records: std::sync::Arc<dyn TokenRecordStore>,
}

impl IntrospectionService {
    /// Creates a new introspection service.
    #[must_use]
    pub fn new(records: std::sync::Arc<dyn TokenRecordStore>) -> Self {
        Self { records }
    }

    /// Introspects a token by access value.
    ///
    /// Absent record, or present but past its access expiry, reports
    /// `active: false` with no further fields.
    ///
    /// # Errors
    ///
    /// Returns an error only when the store itself fails; a missing
    /// record is a well-formed inactive response.
    pub async fn introspect(&self, request: &IntrospectionRequest) -> AuthResult<IntrospectionResponse> {
        let record = match self.records.get_by_access(&request.token).await? {
            Some(record) => record,
            None => return Ok(IntrospectionResponse::inactive()),
        };

        let now = OffsetDateTime::now_utc();
        if record.is_access_expired_at(now) {
            return Ok(IntrospectionResponse::inactive());
        }

        Ok(IntrospectionResponse::active()
            .with_client_id(&record.client_id)
            .with_sub(&record.user_id)
            .with_scope(&record.scope)
            .with_iat(record.created_at.unix_timestamp())
            .with_exp(record.access_expires_at().unix_timestamp()))
    }
}

// =============================================================================
// Remote Client
// =============================================================================

/// HTTP client for the issuer's introspection endpoint.
///
/// Used by resource services for the remote liveness check of the
/// validation pipeline. Every call carries a bounded timeout; a timeout
/// or transport error is surfaced as [`AuthError::Upstream`], never as a
/// liveness verdict.
#[derive(Clone)]
pub struct IntrospectionClient {
    http: reqwest::Client,
    endpoint: String,
}

impl IntrospectionClient {
    /// Creates a new client for the given introspection endpoint URL.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the underlying HTTP client
    /// cannot be built.
    pub fn new(endpoint: impl Into<String>, timeout: StdDuration) -> AuthResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }

    /// Queries the issuer for the token's liveness.
    ///
    /// # Errors
    ///
    /// Returns `Upstream` when the endpoint is unreachable, times out or
    /// responds with a non-success status or an unparseable body.
    pub async fn introspect(&self, token: &str) -> AuthResult<IntrospectionResponse> {
        let response = self
            .http
            .post(&self.endpoint)
            .form(&[("token", token)])
            .send()
            .await
            .map_err(|e| AuthError::upstream(format!("introspection request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AuthError::upstream(format!(
                "introspection returned status {}",
                response.status()
            )));
        }

        response
            .json::<IntrospectionResponse>()
            .await
            .map_err(|e| AuthError::upstream(format!("bad introspection response: {e}")))
    }

    /// Returns the configured endpoint URL.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryTokenStore;
    use crate::types::TokenRecord;
    use std::sync::Arc;
    use time::Duration;

    fn record(access: &str) -> TokenRecord {
        TokenRecord {
            access: access.to_string(),
            refresh: None,
            user_id: "user-1".to_string(),
            client_id: "webclient".to_string(),
            scope: "trade".to_string(),
            created_at: OffsetDateTime::now_utc(),
            access_ttl: Duration::hours(1),
            refresh_ttl: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn test_introspect_live_token() {
        let store = Arc::new(MemoryTokenStore::new());
        store.put(record("acc-1")).await.unwrap();
        let service = IntrospectionService::new(store);

        let response = service
            .introspect(&IntrospectionRequest {
                token: "acc-1".to_string(),
            })
            .await
            .unwrap();

        assert!(response.active);
        assert_eq!(response.client_id, Some("webclient".to_string()));
        assert_eq!(response.sub, Some("user-1".to_string()));
        assert_eq!(response.scope, Some("trade".to_string()));
        assert!(response.iat.is_some());
        assert!(response.exp.is_some());
    }

    #[tokio::test]
    async fn test_introspect_unknown_token_is_bare_inactive() {
        let service = IntrospectionService::new(Arc::new(MemoryTokenStore::new()));

        let response = service
            .introspect(&IntrospectionRequest {
                token: "never-issued".to_string(),
            })
            .await
            .unwrap();

        assert!(!response.active);
        let json = serde_json::to_string(&response).unwrap();
        assert_eq!(json, r#"{"active":false}"#);
    }

    #[tokio::test]
    async fn test_introspect_expired_token_is_inactive() {
        let store = Arc::new(MemoryTokenStore::new());
        let mut rec = record("acc-old");
        rec.created_at = OffsetDateTime::now_utc() - Duration::hours(2);
        store.put(rec).await.unwrap();
        let service = IntrospectionService::new(store);

        let response = service
            .introspect(&IntrospectionRequest {
                token: "acc-old".to_string(),
            })
            .await
            .unwrap();

        assert!(!response.active);
        assert!(response.sub.is_none());
    }

    #[tokio::test]
    async fn test_remote_client_reads_response() {
        use wiremock::matchers::{body_string_contains, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/introspect"))
            .and(body_string_contains("token=acc-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "active": true,
                "client_id": "webclient",
                "sub": "user-1"
            })))
            .mount(&server)
            .await;

        let client = IntrospectionClient::new(
            format!("{}/oauth/introspect", server.uri()),
            StdDuration::from_secs(2),
        )
        .unwrap();

        let response = client.introspect("acc-1").await.unwrap();
        assert!(response.active);
        assert_eq!(response.client_id, Some("webclient".to_string()));
    }

    #[tokio::test]
    async fn test_remote_client_unreachable_is_upstream_error() {
        // Nothing listens on this port.
        let client = IntrospectionClient::new(
            "http://127.0.0.1:1/oauth/introspect",
            StdDuration::from_millis(200),
        )
        .unwrap();

        let err = client.introspect("acc-1").await.unwrap_err();
        assert!(matches!(err, AuthError::Upstream { .. }));
    }

    #[tokio::test]
    async fn test_remote_client_server_error_is_upstream_error() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/introspect"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = IntrospectionClient::new(
            format!("{}/oauth/introspect", server.uri()),
            StdDuration::from_secs(2),
        )
        .unwrap();

        let err = client.introspect("acc-1").await.unwrap_err();
        assert!(matches!(err, AuthError::Upstream { .. }));
    }
}
