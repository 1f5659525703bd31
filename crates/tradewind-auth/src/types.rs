//! Domain types for principals and issued tokens.
//!
//! A principal is either a human user (username + password hash) or a
//! machine client (client id + secret hash). A `TokenRecord` represents
//! one issued access token and, optionally, its paired refresh token.

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

// =============================================================================
// User
// =============================================================================

/// A registered human user.
///
/// Identity is immutable once created; the password hash may be rotated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier for the user.
    pub id: Uuid,

    /// Username used for authentication. Unique.
    pub username: String,

    /// Argon2 PHC hash of the password.
    ///
    /// Stored for the authentication check only; filter this field out
    /// before exposing a user via any API.
    pub password_hash: String,

    /// Whether the account is active. Inactive users cannot authenticate.
    pub active: bool,

    /// When the user was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl User {
    /// Creates a new active user with the given username and password hash.
    #[must_use]
    pub fn new(username: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            password_hash: password_hash.into(),
            active: true,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    /// Returns `true` if the account is active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }
}

// =============================================================================
// Client
// =============================================================================

/// A registered machine client (relying service).
///
/// The client id doubles as the audience value in tokens issued to the
/// client. Identity is permanent; the secret hash may be rotated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    /// Unique client identifier used in grant flows and as token audience.
    pub client_id: String,

    /// Argon2 PHC hash of the shared secret.
    pub secret_hash: String,

    /// Human-readable display name.
    pub name: String,

    /// Whether this client is currently active and can be used.
    pub active: bool,
}

impl Client {
    /// Creates a new active client.
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        secret_hash: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            secret_hash: secret_hash.into(),
            name: name.into(),
            active: true,
        }
    }

    /// Returns `true` if the client is active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }
}

// =============================================================================
// Token Record
// =============================================================================

/// One issued access token and its optional paired refresh token.
///
/// Records back revocation and introspection: deleting the record makes
/// the token inactive even though its signature stays valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRecord {
    /// The access token value. Globally unique across live records.
    pub access: String,

    /// The refresh token value: an opaque random string, never parsed,
    /// only looked up.
    pub refresh: Option<String>,

    /// Identifier of the owning principal (user id or client id).
    pub user_id: String,

    /// Identifier of the client the token was issued to (the audience).
    pub client_id: String,

    /// Space-separated granted scope.
    pub scope: String,

    /// When the token was issued.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// Access token lifetime.
    pub access_ttl: Duration,

    /// Refresh token lifetime. Zero when no refresh token was issued.
    pub refresh_ttl: Duration,
}

impl TokenRecord {
    /// Returns the instant the access window ends.
    #[must_use]
    pub fn access_expires_at(&self) -> OffsetDateTime {
        self.created_at + self.access_ttl
    }

    /// Returns `true` if the access window has elapsed at `now`.
    #[must_use]
    pub fn is_access_expired_at(&self, now: OffsetDateTime) -> bool {
        now >= self.access_expires_at()
    }

    /// Returns `true` if the record is active at `now`: the access window
    /// has not elapsed. Removed records are active for nobody, but that is
    /// the store's concern.
    #[must_use]
    pub fn is_active_at(&self, now: OffsetDateTime) -> bool {
        !self.is_access_expired_at(now)
    }

    /// Returns `true` once both the access and refresh windows have
    /// elapsed plus a grace window. Used by the garbage-collection sweep.
    #[must_use]
    pub fn is_collectable_at(&self, now: OffsetDateTime, grace: Duration) -> bool {
        let longest = if self.refresh_ttl > self.access_ttl {
            self.refresh_ttl
        } else {
            self.access_ttl
        };
        now >= self.created_at + longest + grace
    }
}
