//! Machine credential cache.
//!
//! A service that presents its own machine token on outbound calls keeps
//! exactly one cached token per target issuer. The cache serializes
//! refreshes behind a single mutex: at most one client-credentials grant
//! is in flight at a time, and concurrent callers block until it
//! completes and share its result.
//!
//! # Example
//!
//! ```ignore
//! use tradewind_auth::machine::{MachineTokenCache, MachineTokenConfig};
//!
//! let cache = MachineTokenCache::new(MachineTokenConfig::new(
//!     "http://auth:8080/oauth/token",
//!     "trades-service",
//!     "tradeservicesecret",
//! ))?;
//!
//! let token = cache.token().await?;
//! ```

use std::time::Duration as StdDuration;

use time::{Duration, OffsetDateTime};
use tokio::sync::Mutex;
use tracing::debug;

use crate::AuthResult;
use crate::error::AuthError;
use crate::oauth::TokenResponse;

/// Configuration for a machine credential cache.
#[derive(Debug, Clone)]
pub struct MachineTokenConfig {
    /// The issuer's token endpoint URL.
    pub token_url: String,

    /// This service's client identifier.
    pub client_id: String,

    /// This service's shared secret.
    pub client_secret: String,

    /// Safety margin subtracted from the token's expiry: the cached value
    /// is refreshed once `now >= expires_at - margin`.
    pub refresh_margin: StdDuration,

    /// Bound on the grant round-trip.
    pub request_timeout: StdDuration,
}

impl MachineTokenConfig {
    /// Creates a configuration with the default 10 second margin and
    /// 5 second request timeout.
    #[must_use]
    pub fn new(
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            token_url: token_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            refresh_margin: StdDuration::from_secs(10),
            request_timeout: StdDuration::from_secs(5),
        }
    }

    /// Sets the refresh safety margin.
    #[must_use]
    pub fn with_refresh_margin(mut self, margin: StdDuration) -> Self {
        self.refresh_margin = margin;
        self
    }

    /// Sets the grant request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: StdDuration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// One cached machine token.
#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: OffsetDateTime,
}

impl CachedToken {
    /// Returns `true` while the token is still comfortably inside its
    /// lifetime (expiry minus the safety margin has not passed).
    fn is_fresh_at(&self, now: OffsetDateTime, margin: StdDuration) -> bool {
        now < self.expires_at - Duration::try_from(margin).unwrap_or(Duration::ZERO)
    }
}

/// Cache for this service's own machine token.
///
/// The mutex guards the cached slot across the whole refresh round-trip,
/// so a burst of concurrent callers produces exactly one grant request.
pub struct MachineTokenCache {
    http: reqwest::Client,
    config: MachineTokenConfig,
    slot: Mutex<Option<CachedToken>>,
}

impl MachineTokenCache {
    /// Creates a new cache.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the HTTP client cannot be built.
    pub fn new(config: MachineTokenConfig) -> AuthResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AuthError::configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            config,
            slot: Mutex::new(None),
        })
    }

    /// Returns a machine token, refreshing it if needed.
    ///
    /// The cached token is served while its expiry minus the safety
    /// margin has not passed; otherwise one client-credentials grant is
    /// performed under the lock and its result cached.
    ///
    /// # Errors
    ///
    /// Returns `Upstream` when the grant request fails or times out. The
    /// stale cached value is not served in that case.
    pub async fn token(&self) -> AuthResult<String> {
        let mut slot = self.slot.lock().await;

        let now = OffsetDateTime::now_utc();
        if let Some(ref cached) = *slot {
            if cached.is_fresh_at(now, self.config.refresh_margin) {
                return Ok(cached.access_token.clone());
            }
        }

        // Holding the lock across the round-trip is what makes the
        // refresh single-flight.
        let response = self.request_grant().await?;
        let cached = CachedToken {
            access_token: response.access_token,
            expires_at: now + Duration::seconds(response.expires_in as i64),
        };
        debug!(client_id = %self.config.client_id, "Machine token refreshed");

        let token = cached.access_token.clone();
        *slot = Some(cached);
        Ok(token)
    }

    /// Performs one client-credentials grant against the issuer.
    async fn request_grant(&self) -> AuthResult<TokenResponse> {
        let response = self
            .http
            .post(&self.config.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AuthError::upstream(format!("token request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AuthError::upstream(format!(
                "token endpoint returned status {}",
                response.status()
            )));
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| AuthError::upstream(format!("bad token response: {e}")))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn token_body(token: &str, expires_in: u64) -> serde_json::Value {
        serde_json::json!({
            "access_token": token,
            "token_type": "Bearer",
            "expires_in": expires_in,
            "scope": "default"
        })
    }

    fn cache_for(server: &MockServer) -> MachineTokenCache {
        MachineTokenCache::new(
            MachineTokenConfig::new(
                format!("{}/oauth/token", server.uri()),
                "trades-service",
                "tradeservicesecret",
            )
            .with_request_timeout(StdDuration::from_secs(2)),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_caches_token_until_margin() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .and(body_string_contains("grant_type=client_credentials"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body("tok-1", 3600)))
            .expect(1)
            .mount(&server)
            .await;

        let cache = cache_for(&server);
        assert_eq!(cache.token().await.unwrap(), "tok-1");
        // Second call is served from the cache; the mock's expect(1)
        // fails the test if a second request goes out.
        assert_eq!(cache.token().await.unwrap(), "tok-1");
    }

    #[tokio::test]
    async fn test_refreshes_once_past_margin() {
        let server = MockServer::start().await;
        // First grant expires in 5s with a 10s margin: immediately stale.
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body("tok-old", 5)))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body("tok-new", 3600)))
            .mount(&server)
            .await;

        let cache = cache_for(&server);
        assert_eq!(cache.token().await.unwrap(), "tok-old");
        // Past expiry-minus-margin: exactly one refresh, new token served.
        assert_eq!(cache.token().await.unwrap(), "tok-new");
        assert_eq!(cache.token().await.unwrap(), "tok-new");
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_grant() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(token_body("tok-shared", 3600))
                    .set_delay(StdDuration::from_millis(100)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let cache = Arc::new(cache_for(&server));

        // Both callers arrive with an empty cache; the slow grant is in
        // flight while the second caller waits on the lock.
        let a = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.token().await.unwrap() })
        };
        let b = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.token().await.unwrap() })
        };

        let (a, b) = (a.await.unwrap(), b.await.unwrap());
        assert_eq!(a, "tok-shared");
        assert_eq!(b, "tok-shared");
        // expect(1) verifies a single grant request on drop.
    }

    #[tokio::test]
    async fn test_grant_failure_is_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": "invalid_client"
            })))
            .mount(&server)
            .await;

        let cache = cache_for(&server);
        let err = cache.token().await.unwrap_err();
        assert!(matches!(err, AuthError::Upstream { .. }));
    }

    #[tokio::test]
    async fn test_unreachable_issuer_is_upstream_error() {
        let cache = MachineTokenCache::new(
            MachineTokenConfig::new(
                "http://127.0.0.1:1/oauth/token",
                "trades-service",
                "secret",
            )
            .with_request_timeout(StdDuration::from_millis(200)),
        )
        .unwrap();

        let err = cache.token().await.unwrap_err();
        assert!(matches!(err, AuthError::Upstream { .. }));
    }
}
