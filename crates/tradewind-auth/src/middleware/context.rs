//! Authenticated request context.

use std::sync::Arc;

use crate::codec::AccessTokenClaims;

/// Context extracted from a validated bearer token.
///
/// Handed to downstream handlers once the full validation pipeline has
/// passed. Claims are wrapped in `Arc` for cheap cloning across async
/// boundaries.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Validated access token claims.
    pub claims: Arc<AccessTokenClaims>,
}

impl AuthContext {
    /// Creates a new context from validated claims.
    #[must_use]
    pub fn new(claims: AccessTokenClaims) -> Self {
        Self {
            claims: Arc::new(claims),
        }
    }

    /// Gets the principal identifier (user id, or client id for machine
    /// tokens).
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.claims.sub
    }

    /// Gets the username, carried for human subjects only.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.claims.username.as_deref()
    }

    /// Gets the audience the token was issued to.
    #[must_use]
    pub fn audience(&self) -> &str {
        &self.claims.aud
    }

    /// Gets the unique token identifier.
    #[must_use]
    pub fn jti(&self) -> &str {
        &self.claims.jti
    }

    /// Returns `true` if the token was issued to a human subject.
    #[must_use]
    pub fn is_user(&self) -> bool {
        self.claims.username.is_some()
    }

    /// Checks if the token carries a specific scope (exact match on
    /// space-separated values).
    #[must_use]
    pub fn has_scope(&self, scope: &str) -> bool {
        self.claims.scope.split_whitespace().any(|s| s == scope)
    }

    /// Returns all scopes as an iterator.
    pub fn scopes(&self) -> impl Iterator<Item = &str> {
        self.claims.scope.split_whitespace()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::AccessTokenClaims;

    fn context(username: Option<&str>) -> AuthContext {
        let mut builder = AccessTokenClaims::builder(
            "https://auth.tradewind.test",
            "user-123",
            "webclient",
        )
        .scope("trade quotes")
        .expires_in_seconds(3600);
        if let Some(name) = username {
            builder = builder.username(name);
        }
        AuthContext::new(builder.build())
    }

    #[test]
    fn test_accessors() {
        let ctx = context(Some("alice"));
        assert_eq!(ctx.subject(), "user-123");
        assert_eq!(ctx.username(), Some("alice"));
        assert_eq!(ctx.audience(), "webclient");
        assert!(ctx.is_user());
    }

    #[test]
    fn test_machine_context_has_no_username() {
        let ctx = context(None);
        assert!(ctx.username().is_none());
        assert!(!ctx.is_user());
    }

    #[test]
    fn test_scope_checks() {
        let ctx = context(Some("alice"));
        assert!(ctx.has_scope("trade"));
        assert!(ctx.has_scope("quotes"));
        assert!(!ctx.has_scope("admin"));
        assert_eq!(ctx.scopes().collect::<Vec<_>>(), vec!["trade", "quotes"]);
    }
}
