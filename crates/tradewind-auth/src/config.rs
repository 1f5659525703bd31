//! Credential configuration types.
//!
//! Shared configuration sections for the issuer and for the services that
//! validate tokens or hold machine credentials. Durations use humantime
//! strings in TOML (`"1h"`, `"30s"`).
//!
//! # Example (TOML)
//!
//! ```toml
//! [auth]
//! issuer = "http://localhost:8080"
//! access_token_lifetime = "1h"
//! refresh_token_lifetime = "24h"
//!
//! [validator]
//! introspection_url = "http://localhost:8080/oauth/introspect"
//! expected_audience = "trades-service"
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::AuthError;

/// Environment variable consulted for the signing secret when the config
/// file does not carry one.
pub const SIGNING_KEY_ENV: &str = "TRADEWIND_SIGNING_KEY";

/// Minimum accepted signing secret length in bytes.
const MIN_SIGNING_KEY_LEN: usize = 16;

// =============================================================================
// Issuer Settings
// =============================================================================

/// Configuration for the credential service's issuing side.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthSettings {
    /// Issuer URL, included in tokens as `iss`.
    pub issuer: String,

    /// Shared signing secret. Usually left empty in the file and supplied
    /// via the `TRADEWIND_SIGNING_KEY` environment variable.
    pub signing_key: String,

    /// Scope granted when a request does not ask for one.
    pub default_scope: String,

    /// Access token lifetime.
    #[serde(with = "humantime_serde")]
    pub access_token_lifetime: Duration,

    /// Refresh token lifetime.
    #[serde(with = "humantime_serde")]
    pub refresh_token_lifetime: Duration,

    /// Whether password grants are issued a paired refresh token.
    pub issue_refresh_tokens: bool,

    /// Interval between garbage-collection sweeps of the token store.
    #[serde(with = "humantime_serde")]
    pub gc_interval: Duration,

    /// Grace window added past expiry before a record is collected.
    #[serde(with = "humantime_serde")]
    pub gc_grace: Duration,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            issuer: "http://localhost:8080".to_string(),
            signing_key: String::new(),
            default_scope: "default".to_string(),
            access_token_lifetime: Duration::from_secs(3600),
            refresh_token_lifetime: Duration::from_secs(24 * 3600),
            issue_refresh_tokens: true,
            gc_interval: Duration::from_secs(60),
            gc_grace: Duration::from_secs(300),
        }
    }
}

impl AuthSettings {
    /// Resolves the signing secret, falling back to the environment.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when no secret is set anywhere or
    /// the secret is shorter than 16 bytes. Callers treat this as fatal
    /// at process start.
    pub fn resolve_signing_key(&self) -> Result<String, AuthError> {
        let key = if self.signing_key.is_empty() {
            std::env::var(SIGNING_KEY_ENV).unwrap_or_default()
        } else {
            self.signing_key.clone()
        };

        if key.is_empty() {
            return Err(AuthError::configuration(format!(
                "signing key is required: set auth.signing_key or {SIGNING_KEY_ENV}"
            )));
        }
        if key.len() < MIN_SIGNING_KEY_LEN {
            return Err(AuthError::configuration(format!(
                "signing key must be at least {MIN_SIGNING_KEY_LEN} bytes"
            )));
        }
        Ok(key)
    }

    /// Validates the settings.
    ///
    /// # Errors
    ///
    /// Returns a configuration error describing the first invalid value.
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.issuer.is_empty() {
            return Err(AuthError::configuration("auth.issuer must not be empty"));
        }
        if self.access_token_lifetime.is_zero() {
            return Err(AuthError::configuration(
                "auth.access_token_lifetime must be > 0",
            ));
        }
        if self.issue_refresh_tokens && self.refresh_token_lifetime.is_zero() {
            return Err(AuthError::configuration(
                "auth.refresh_token_lifetime must be > 0 when refresh tokens are issued",
            ));
        }
        if self.gc_interval.is_zero() {
            return Err(AuthError::configuration("auth.gc_interval must be > 0"));
        }
        Ok(())
    }
}

// =============================================================================
// Validator Settings
// =============================================================================

/// Configuration for a resource service's validation pipeline.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ValidatorSettings {
    /// Issuer identity expected in token `iss` claims.
    pub issuer: String,

    /// The issuer's introspection endpoint URL.
    pub introspection_url: String,

    /// This service's own client identifier; the audience tokens must
    /// carry to be accepted here. Configured per deployment.
    pub expected_audience: String,

    /// Bound on the introspection round-trip.
    #[serde(with = "humantime_serde")]
    pub introspection_timeout: Duration,
}

impl Default for ValidatorSettings {
    fn default() -> Self {
        Self {
            issuer: "http://localhost:8080".to_string(),
            introspection_url: "http://localhost:8080/oauth/introspect".to_string(),
            expected_audience: String::new(),
            introspection_timeout: Duration::from_secs(5),
        }
    }
}

impl ValidatorSettings {
    /// Validates the settings.
    ///
    /// # Errors
    ///
    /// Returns a configuration error describing the first invalid value.
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.introspection_url.is_empty() {
            return Err(AuthError::configuration(
                "validator.introspection_url must not be empty",
            ));
        }
        if self.expected_audience.is_empty() {
            return Err(AuthError::configuration(
                "validator.expected_audience must not be empty",
            ));
        }
        if self.introspection_timeout.is_zero() {
            return Err(AuthError::configuration(
                "validator.introspection_timeout must be > 0",
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Machine Token Settings
// =============================================================================

/// Configuration for a service's own machine credential.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MachineTokenSettings {
    /// The issuer's token endpoint URL.
    pub token_url: String,

    /// This service's client identifier.
    pub client_id: String,

    /// This service's shared secret.
    pub client_secret: String,

    /// Safety margin before expiry at which the token is refreshed.
    #[serde(with = "humantime_serde")]
    pub refresh_margin: Duration,

    /// Bound on the grant round-trip.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for MachineTokenSettings {
    fn default() -> Self {
        Self {
            token_url: "http://localhost:8080/oauth/token".to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            refresh_margin: Duration::from_secs(10),
            request_timeout: Duration::from_secs(5),
        }
    }
}

impl MachineTokenSettings {
    /// Validates the settings.
    ///
    /// # Errors
    ///
    /// Returns a configuration error describing the first invalid value.
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.token_url.is_empty() {
            return Err(AuthError::configuration(
                "machine.token_url must not be empty",
            ));
        }
        if self.client_id.is_empty() || self.client_secret.is_empty() {
            return Err(AuthError::configuration(
                "machine.client_id and machine.client_secret are required",
            ));
        }
        Ok(())
    }
}
