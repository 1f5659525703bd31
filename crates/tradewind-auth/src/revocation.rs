//! Token revocation (RFC 7009 semantics).
//!
//! Revocation removes the token record, which makes all future
//! introspection of that token report `active: false`. Revoking an
//! unknown or already-revoked token succeeds: the endpoint never reveals
//! whether a token existed.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::AuthResult;
use crate::store::TokenRecordStore;

// =============================================================================
// Request Types
// =============================================================================

/// Token revocation request.
#[derive(Debug, Clone, Deserialize)]
pub struct RevocationRequest {
    /// The token to revoke (access or refresh value).
    pub token: String,

    /// Optional hint about the token type.
    ///
    /// A hint only steers which lookup runs first; a wrong hint never
    /// prevents revocation.
    #[serde(default)]
    pub token_type_hint: Option<TokenTypeHint>,
}

/// Token type hint for revocation requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenTypeHint {
    /// The token is an access token.
    AccessToken,
    /// The token is a refresh token.
    RefreshToken,
}

impl TokenTypeHint {
    /// Returns the token type hint as a string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccessToken => "access_token",
            Self::RefreshToken => "refresh_token",
        }
    }

    /// Parses a hint string; unknown values are treated as no hint.
    #[must_use]
    pub fn parse(hint: &str) -> Option<Self> {
        match hint {
            "access_token" => Some(Self::AccessToken),
            "refresh_token" => Some(Self::RefreshToken),
            _ => None,
        }
    }
}

impl std::fmt::Display for TokenTypeHint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Service
// =============================================================================

/// Revocation against the local token record store.
pub struct RevocationService {
    records: std::sync::Arc<dyn TokenRecordStore>,
}

impl RevocationService {
    /// Creates a new revocation service.
    #[must_use]
    pub fn new(records: std::sync::Arc<dyn TokenRecordStore>) -> Self {
        Self { records }
    }

    /// Revokes a token.
    ///
    /// If hinted, removal is attempted by that kind first; when the hint
    /// is absent or the hinted removal finds nothing, the other kind is
    /// attempted. The operation is idempotent and succeeds whether or not
    /// a record existed.
    ///
    /// # Errors
    ///
    /// Returns an error only when the store itself fails.
    pub async fn revoke(&self, request: &RevocationRequest) -> AuthResult<()> {
        let removed = match request.token_type_hint {
            Some(TokenTypeHint::AccessToken) | None => {
                self.records.remove_by_access(&request.token).await?
                    || self.records.remove_by_refresh(&request.token).await?
            }
            Some(TokenTypeHint::RefreshToken) => {
                self.records.remove_by_refresh(&request.token).await?
                    || self.records.remove_by_access(&request.token).await?
            }
        };

        debug!(removed, "Token revocation processed");
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::introspection::{IntrospectionRequest, IntrospectionService};
    use crate::store::memory::MemoryTokenStore;
    use crate::types::TokenRecord;
    use std::sync::Arc;
    use time::{Duration, OffsetDateTime};

    fn record(access: &str, refresh: Option<&str>) -> TokenRecord {
        TokenRecord {
            access: access.to_string(),
            refresh: refresh.map(str::to_string),
            user_id: "user-1".to_string(),
            client_id: "webclient".to_string(),
            scope: "trade".to_string(),
            created_at: OffsetDateTime::now_utc(),
            access_ttl: Duration::hours(1),
            refresh_ttl: Duration::hours(24),
        }
    }

    fn services(store: Arc<MemoryTokenStore>) -> (RevocationService, IntrospectionService) {
        (
            RevocationService::new(Arc::clone(&store) as Arc<dyn crate::store::TokenRecordStore>),
            IntrospectionService::new(store),
        )
    }

    #[tokio::test]
    async fn test_revoke_then_introspect_inactive() {
        let store = Arc::new(MemoryTokenStore::new());
        store.put(record("acc-1", Some("ref-1"))).await.unwrap();
        let (revocation, introspection) = services(Arc::clone(&store));

        revocation
            .revoke(&RevocationRequest {
                token: "acc-1".to_string(),
                token_type_hint: Some(TokenTypeHint::AccessToken),
            })
            .await
            .unwrap();

        let response = introspection
            .introspect(&IntrospectionRequest {
                token: "acc-1".to_string(),
            })
            .await
            .unwrap();
        assert!(!response.active);
    }

    #[tokio::test]
    async fn test_revoke_with_wrong_hint_still_removes() {
        let store = Arc::new(MemoryTokenStore::new());
        store.put(record("acc-1", Some("ref-1"))).await.unwrap();
        let (revocation, introspection) = services(Arc::clone(&store));

        // The token value is an access token but the hint says refresh;
        // the fallback lookup must still find and remove it.
        revocation
            .revoke(&RevocationRequest {
                token: "acc-1".to_string(),
                token_type_hint: Some(TokenTypeHint::RefreshToken),
            })
            .await
            .unwrap();

        let response = introspection
            .introspect(&IntrospectionRequest {
                token: "acc-1".to_string(),
            })
            .await
            .unwrap();
        assert!(!response.active);
    }

    #[tokio::test]
    async fn test_revoke_by_refresh_value_without_hint() {
        let store = Arc::new(MemoryTokenStore::new());
        store.put(record("acc-1", Some("ref-1"))).await.unwrap();
        let (revocation, _) = services(Arc::clone(&store));

        revocation
            .revoke(&RevocationRequest {
                token: "ref-1".to_string(),
                token_type_hint: None,
            })
            .await
            .unwrap();

        assert!(store.get_by_access("acc-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_revoke_unknown_token_succeeds() {
        let store = Arc::new(MemoryTokenStore::new());
        let (revocation, _) = services(store);

        // Never-issued token: still Ok.
        revocation
            .revoke(&RevocationRequest {
                token: "never-issued".to_string(),
                token_type_hint: None,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_revoke_is_idempotent() {
        let store = Arc::new(MemoryTokenStore::new());
        store.put(record("acc-1", None)).await.unwrap();
        let (revocation, _) = services(store);

        let request = RevocationRequest {
            token: "acc-1".to_string(),
            token_type_hint: None,
        };
        revocation.revoke(&request).await.unwrap();
        revocation.revoke(&request).await.unwrap();
    }

    #[test]
    fn test_hint_parsing() {
        assert_eq!(
            TokenTypeHint::parse("access_token"),
            Some(TokenTypeHint::AccessToken)
        );
        assert_eq!(
            TokenTypeHint::parse("refresh_token"),
            Some(TokenTypeHint::RefreshToken)
        );
        assert_eq!(TokenTypeHint::parse("other"), None);
        assert_eq!(TokenTypeHint::parse(""), None);
    }
}
