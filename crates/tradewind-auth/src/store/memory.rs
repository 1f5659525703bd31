//! In-memory storage backends.
//!
//! A single `RwLock` guards both indexes of the token store, so writers
//! are atomic with respect to readers: no reader ever observes a record
//! mid-write, and removing a record drops both its access and refresh
//! entries in one critical section.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use time::{Duration, OffsetDateTime};

use crate::AuthResult;
use crate::error::AuthError;
use crate::secret::verify_secret;
use crate::store::{ClientStore, TokenRecordStore, UserStore};
use crate::types::{Client, TokenRecord, User};

// =============================================================================
// Token Record Store
// =============================================================================

#[derive(Default)]
struct TokenIndexes {
    /// access token value -> record
    by_access: HashMap<String, TokenRecord>,
    /// refresh token value -> access token value
    by_refresh: HashMap<String, String>,
}

/// In-memory [`TokenRecordStore`].
#[derive(Default)]
pub struct MemoryTokenStore {
    inner: RwLock<TokenIndexes>,
}

impl MemoryTokenStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of live records.
    ///
    /// # Errors
    ///
    /// Returns an error if the store lock is poisoned.
    pub fn len(&self) -> AuthResult<usize> {
        Ok(self.read()?.by_access.len())
    }

    /// Returns `true` if the store holds no records.
    ///
    /// # Errors
    ///
    /// Returns an error if the store lock is poisoned.
    pub fn is_empty(&self) -> AuthResult<bool> {
        Ok(self.read()?.by_access.is_empty())
    }

    fn read(&self) -> AuthResult<std::sync::RwLockReadGuard<'_, TokenIndexes>> {
        self.inner
            .read()
            .map_err(|_| AuthError::storage("token store lock poisoned"))
    }

    fn write(&self) -> AuthResult<std::sync::RwLockWriteGuard<'_, TokenIndexes>> {
        self.inner
            .write()
            .map_err(|_| AuthError::storage("token store lock poisoned"))
    }
}

#[async_trait]
impl TokenRecordStore for MemoryTokenStore {
    async fn put(&self, record: TokenRecord) -> AuthResult<()> {
        let mut indexes = self.write()?;
        if let Some(ref refresh) = record.refresh {
            indexes
                .by_refresh
                .insert(refresh.clone(), record.access.clone());
        }
        indexes.by_access.insert(record.access.clone(), record);
        Ok(())
    }

    async fn get_by_access(&self, access: &str) -> AuthResult<Option<TokenRecord>> {
        Ok(self.read()?.by_access.get(access).cloned())
    }

    async fn get_by_refresh(&self, refresh: &str) -> AuthResult<Option<TokenRecord>> {
        let indexes = self.read()?;
        Ok(indexes
            .by_refresh
            .get(refresh)
            .and_then(|access| indexes.by_access.get(access))
            .cloned())
    }

    async fn remove_by_access(&self, access: &str) -> AuthResult<bool> {
        let mut indexes = self.write()?;
        match indexes.by_access.remove(access) {
            Some(record) => {
                if let Some(ref refresh) = record.refresh {
                    indexes.by_refresh.remove(refresh);
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn remove_by_refresh(&self, refresh: &str) -> AuthResult<bool> {
        let mut indexes = self.write()?;
        match indexes.by_refresh.remove(refresh) {
            Some(access) => {
                indexes.by_access.remove(&access);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn collect_expired(&self, grace: Duration) -> AuthResult<u64> {
        let now = OffsetDateTime::now_utc();
        let mut indexes = self.write()?;

        let dead: Vec<String> = indexes
            .by_access
            .values()
            .filter(|r| r.is_collectable_at(now, grace))
            .map(|r| r.access.clone())
            .collect();

        for access in &dead {
            if let Some(record) = indexes.by_access.remove(access) {
                if let Some(ref refresh) = record.refresh {
                    indexes.by_refresh.remove(refresh);
                }
            }
        }

        Ok(dead.len() as u64)
    }
}

// =============================================================================
// User Store
// =============================================================================

/// In-memory [`UserStore`] keyed by username.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<String, User>>,
}

impl MemoryUserStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> AuthResult<std::sync::RwLockReadGuard<'_, HashMap<String, User>>> {
        self.users
            .read()
            .map_err(|_| AuthError::storage("user store lock poisoned"))
    }

    fn write(&self) -> AuthResult<std::sync::RwLockWriteGuard<'_, HashMap<String, User>>> {
        self.users
            .write()
            .map_err(|_| AuthError::storage("user store lock poisoned"))
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_username(&self, username: &str) -> AuthResult<Option<User>> {
        Ok(self.read()?.get(username).cloned())
    }

    async fn create(&self, user: &User) -> AuthResult<()> {
        let mut users = self.write()?;
        if users.contains_key(&user.username) {
            return Err(AuthError::invalid_request("username already registered"));
        }
        users.insert(user.username.clone(), user.clone());
        Ok(())
    }

    async fn verify_password(&self, username: &str, password: &str) -> AuthResult<bool> {
        let hash = match self.read()?.get(username) {
            Some(user) if user.is_active() => user.password_hash.clone(),
            _ => return Ok(false),
        };
        Ok(verify_secret(password, &hash))
    }
}

// =============================================================================
// Client Store
// =============================================================================

/// In-memory [`ClientStore`] keyed by client id.
#[derive(Default)]
pub struct MemoryClientStore {
    clients: RwLock<HashMap<String, Client>>,
}

impl MemoryClientStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> AuthResult<std::sync::RwLockReadGuard<'_, HashMap<String, Client>>> {
        self.clients
            .read()
            .map_err(|_| AuthError::storage("client store lock poisoned"))
    }

    fn write(&self) -> AuthResult<std::sync::RwLockWriteGuard<'_, HashMap<String, Client>>> {
        self.clients
            .write()
            .map_err(|_| AuthError::storage("client store lock poisoned"))
    }
}

#[async_trait]
impl ClientStore for MemoryClientStore {
    async fn find_by_client_id(&self, client_id: &str) -> AuthResult<Option<Client>> {
        Ok(self.read()?.get(client_id).cloned())
    }

    async fn create(&self, client: &Client) -> AuthResult<()> {
        let mut clients = self.write()?;
        if clients.contains_key(&client.client_id) {
            return Err(AuthError::invalid_request("client id already registered"));
        }
        clients.insert(client.client_id.clone(), client.clone());
        Ok(())
    }

    async fn verify_secret(&self, client_id: &str, secret: &str) -> AuthResult<bool> {
        let hash = match self.read()?.get(client_id) {
            Some(client) if client.is_active() => client.secret_hash.clone(),
            _ => return Ok(false),
        };
        Ok(verify_secret(secret, &hash))
    }
}

// =============================================================================
// Tests
// =============================================================================
