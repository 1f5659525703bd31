//! Token issuance for the two supported grant flows.
//!
//! The issuer authenticates the principal against the principal stores,
//! mints a signed claim set via the codec, and persists one token record
//! per successful grant. Client authentication itself happens at the HTTP
//! boundary; the authenticated [`Client`] is passed explicitly down the
//! grant→mint call chain.
//!
//! # Usage
//!
//! ```ignore
//! use tradewind_auth::issuer::{IssuerConfig, TokenIssuer};
//!
//! let config = IssuerConfig::new("https://auth.tradewind.dev");
//! let issuer = TokenIssuer::new(codec, users, records, config);
//!
//! let response = issuer.password_grant(&request, &client).await?;
//! ```

use std::sync::Arc;

use time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use crate::AuthResult;
use crate::codec::{AccessTokenClaims, TokenCodec};
use crate::error::AuthError;
use crate::oauth::{TokenRequest, TokenResponse};
use crate::store::{TokenRecordStore, UserStore};
use crate::types::{Client, TokenRecord};

/// Message returned for every resource-owner authentication failure.
///
/// Unknown-user and wrong-password must stay indistinguishable to avoid
/// username enumeration.
const INVALID_CREDENTIALS: &str = "invalid username or password";

/// Configuration for the token issuer.
#[derive(Debug, Clone)]
pub struct IssuerConfig {
    /// Issuer URL (included in tokens as `iss`).
    pub issuer: String,

    /// Scope granted when the request does not ask for one.
    pub default_scope: String,

    /// Access token lifetime.
    pub access_token_lifetime: Duration,

    /// Refresh token lifetime.
    pub refresh_token_lifetime: Duration,

    /// Whether password grants are issued a paired refresh token.
    pub issue_refresh_tokens: bool,
}

impl IssuerConfig {
    /// Creates a new issuer configuration with defaults.
    #[must_use]
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            default_scope: "default".to_string(),
            access_token_lifetime: Duration::hours(1),
            refresh_token_lifetime: Duration::hours(24),
            issue_refresh_tokens: true,
        }
    }

    /// Sets the default scope.
    #[must_use]
    pub fn with_default_scope(mut self, scope: impl Into<String>) -> Self {
        self.default_scope = scope.into();
        self
    }

    /// Sets the access token lifetime.
    #[must_use]
    pub fn with_access_token_lifetime(mut self, lifetime: Duration) -> Self {
        self.access_token_lifetime = lifetime;
        self
    }

    /// Sets the refresh token lifetime.
    #[must_use]
    pub fn with_refresh_token_lifetime(mut self, lifetime: Duration) -> Self {
        self.refresh_token_lifetime = lifetime;
        self
    }

    /// Sets whether password grants receive refresh tokens.
    #[must_use]
    pub fn with_refresh_tokens(mut self, issue: bool) -> Self {
        self.issue_refresh_tokens = issue;
        self
    }
}

/// Orchestrates grant requests into issued tokens.
pub struct TokenIssuer {
    codec: Arc<TokenCodec>,
    users: Arc<dyn UserStore>,
    records: Arc<dyn TokenRecordStore>,
    config: IssuerConfig,
}

impl TokenIssuer {
    /// Creates a new token issuer.
    #[must_use]
    pub fn new(
        codec: Arc<TokenCodec>,
        users: Arc<dyn UserStore>,
        records: Arc<dyn TokenRecordStore>,
        config: IssuerConfig,
    ) -> Self {
        Self {
            codec,
            users,
            records,
            config,
        }
    }

    /// Handles the resource-owner password grant.
    ///
    /// Authenticates the named user, mints a claim set with the user as
    /// subject and the authenticated client as audience, persists one
    /// token record and returns the token pair.
    ///
    /// # Errors
    ///
    /// - `InvalidGrant` for an unknown user, inactive account or wrong
    ///   password (one generic message for all three)
    /// - `InvalidRequest` when username or password is missing
    /// - `Internal` when signing fails (fatal to the request only)
    pub async fn password_grant(
        &self,
        request: &TokenRequest,
        client: &Client,
    ) -> AuthResult<TokenResponse> {
        if request.grant_type != "password" {
            return Err(AuthError::unsupported_grant_type(&request.grant_type));
        }

        let username = request
            .username
            .as_deref()
            .ok_or_else(|| AuthError::invalid_request("missing username parameter"))?;
        let password = request
            .password
            .as_deref()
            .ok_or_else(|| AuthError::invalid_request("missing password parameter"))?;

        let user = self
            .users
            .find_by_username(username)
            .await?
            .filter(|u| u.is_active())
            .ok_or_else(|| AuthError::invalid_grant(INVALID_CREDENTIALS))?;

        if !self.users.verify_password(username, password).await? {
            warn!(client_id = %client.client_id, "Password verification failed");
            return Err(AuthError::invalid_grant(INVALID_CREDENTIALS));
        }

        let scope = request
            .scope
            .clone()
            .unwrap_or_else(|| self.config.default_scope.clone());

        let claims = AccessTokenClaims::builder(
            &self.config.issuer,
            user.id.to_string(),
            &client.client_id,
        )
        .scope(&scope)
        .username(&user.username)
        .expires_in_seconds(self.config.access_token_lifetime.whole_seconds())
        .build();

        let refresh = self
            .config
            .issue_refresh_tokens
            .then(|| Uuid::new_v4().to_string());

        let response = self.mint(claims, refresh, user.id.to_string(), client).await?;

        info!(
            client_id = %client.client_id,
            subject = %user.id,
            "Password grant issued"
        );
        Ok(response)
    }

    /// Handles the client-credentials grant.
    ///
    /// The authenticated client is both subject and audience: a
    /// self-scoped machine token. No refresh token is issued.
    ///
    /// # Errors
    ///
    /// - `UnsupportedGrantType` when the grant type does not match
    /// - `Internal` when signing fails
    pub async fn client_credentials_grant(
        &self,
        request: &TokenRequest,
        client: &Client,
    ) -> AuthResult<TokenResponse> {
        if request.grant_type != "client_credentials" {
            return Err(AuthError::unsupported_grant_type(&request.grant_type));
        }

        let scope = request
            .scope
            .clone()
            .unwrap_or_else(|| self.config.default_scope.clone());

        let claims = AccessTokenClaims::builder(
            &self.config.issuer,
            &client.client_id,
            &client.client_id,
        )
        .scope(&scope)
        .expires_in_seconds(self.config.access_token_lifetime.whole_seconds())
        .build();

        let response = self
            .mint(claims, None, client.client_id.clone(), client)
            .await?;

        info!(client_id = %client.client_id, "Client-credentials grant issued");
        Ok(response)
    }

    /// Signs the claim set, persists the token record and builds the
    /// response. The store write is the only side effect, and it happens
    /// last: a failed grant leaves no record behind.
    async fn mint(
        &self,
        claims: AccessTokenClaims,
        refresh: Option<String>,
        user_id: String,
        client: &Client,
    ) -> AuthResult<TokenResponse> {
        let access_token = self.codec.sign(&claims).map_err(|e| {
            warn!(client_id = %client.client_id, error = %e, "Failed to sign claim set");
            AuthError::internal(format!("failed to sign claim set: {e}"))
        })?;

        let record = TokenRecord {
            access: access_token.clone(),
            refresh: refresh.clone(),
            user_id,
            client_id: client.client_id.clone(),
            scope: claims.scope.clone(),
            created_at: time::OffsetDateTime::from_unix_timestamp(claims.iat)
                .map_err(|e| AuthError::internal(format!("invalid issued-at timestamp: {e}")))?,
            access_ttl: self.config.access_token_lifetime,
            refresh_ttl: if refresh.is_some() {
                self.config.refresh_token_lifetime
            } else {
                Duration::ZERO
            },
        };
        self.records.put(record).await?;

        let mut response = TokenResponse::new(
            access_token,
            self.config.access_token_lifetime.whole_seconds() as u64,
            claims.scope,
        );
        if let Some(refresh) = refresh {
            response = response.with_refresh_token(refresh);
        }
        Ok(response)
    }

    /// Gets the codec reference.
    #[must_use]
    pub fn codec(&self) -> &Arc<TokenCodec> {
        &self.codec
    }

    /// Gets the issuer configuration.
    #[must_use]
    pub fn config(&self) -> &IssuerConfig {
        &self.config
    }
}
