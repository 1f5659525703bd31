//! Storage traits for credential data.
//!
//! This module defines storage interfaces for:
//!
//! - Issued token records (backing revocation and introspection)
//! - Registered users (password hashes)
//! - Registered machine clients (secret hashes)
//!
//! The memory-backed implementations in [`memory`] provide the internal
//! consistency the callers rely on; no external locking is required.

pub mod memory;

use async_trait::async_trait;
use time::Duration;

use crate::AuthResult;
use crate::types::{Client, TokenRecord, User};

// =============================================================================
// Token Record Store
// =============================================================================

/// Storage operations for issued token records.
///
/// All operations are safe under concurrent invocation; `put` and the
/// `remove_*` operations are atomic with respect to the `get_*`
/// operations. A lookup miss is not an error: it is `Ok(None)` or
/// `Ok(false)`, leaving the caller to decide whether that means "never
/// issued" or "already revoked" (deliberately indistinguishable).
#[async_trait]
pub trait TokenRecordStore: Send + Sync {
    /// Stores a record for a newly issued token.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn put(&self, record: TokenRecord) -> AuthResult<()>;

    /// Looks up a record by access token value.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn get_by_access(&self, access: &str) -> AuthResult<Option<TokenRecord>>;

    /// Looks up a record by refresh token value.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn get_by_refresh(&self, refresh: &str) -> AuthResult<Option<TokenRecord>>;

    /// Removes a record by access token value.
    ///
    /// Returns `true` if a record was removed, `false` if none existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn remove_by_access(&self, access: &str) -> AuthResult<bool>;

    /// Removes a record by refresh token value.
    ///
    /// Returns `true` if a record was removed, `false` if none existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn remove_by_refresh(&self, refresh: &str) -> AuthResult<bool>;

    /// Deletes records whose access and refresh windows have both elapsed
    /// plus the given grace window. Invoked on a fixed interval by the
    /// credential service's sweep task.
    ///
    /// Returns the number of records deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the cleanup operation fails.
    async fn collect_expired(&self, grace: Duration) -> AuthResult<u64>;
}

// =============================================================================
// Principal Stores
// =============================================================================

/// Storage operations for registered users.
///
/// Only hashed secrets ever cross this interface; plaintext passwords are
/// consumed by `verify_password` and discarded.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Finds a user by username. Returns `None` if unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_username(&self, username: &str) -> AuthResult<Option<User>>;

    /// Creates a new user.
    ///
    /// # Errors
    ///
    /// Returns an error if the username is already taken or the storage
    /// operation fails.
    async fn create(&self, user: &User) -> AuthResult<()>;

    /// Verifies a user's password against the stored hash.
    ///
    /// Returns `Ok(false)` for an unknown user so that callers can keep
    /// unknown-user and wrong-password indistinguishable.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn verify_password(&self, username: &str, password: &str) -> AuthResult<bool>;
}

/// Storage operations for registered machine clients.
#[async_trait]
pub trait ClientStore: Send + Sync {
    /// Finds a client by its identifier. Returns `None` if unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_client_id(&self, client_id: &str) -> AuthResult<Option<Client>>;

    /// Creates a new client registration.
    ///
    /// # Errors
    ///
    /// Returns an error if the client id is already taken or the storage
    /// operation fails.
    async fn create(&self, client: &Client) -> AuthResult<()>;

    /// Verifies a client's shared secret against the stored hash.
    ///
    /// Returns `Ok(false)` for an unknown client.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn verify_secret(&self, client_id: &str, secret: &str) -> AuthResult<bool>;
}
