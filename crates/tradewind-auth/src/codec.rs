//! Signed claim-set encoding and verification.
//!
//! The credential codec builds and verifies the signed claim sets carried
//! inside access tokens. Signing uses HS256 with a single symmetric secret
//! shared by the issuer and every validating service; rotating the secret
//! invalidates all outstanding tokens.
//!
//! # Example
//!
//! ```ignore
//! use tradewind_auth::codec::{AccessTokenClaims, TokenCodec};
//!
//! let codec = TokenCodec::new(b"shared-secret", "https://auth.tradewind.dev");
//!
//! let claims = AccessTokenClaims::builder("https://auth.tradewind.dev", "user-1", "webclient")
//!     .scope("trade")
//!     .expires_in_seconds(3600)
//!     .build();
//!
//! let token = codec.sign(&claims)?;
//! let verified = codec.verify(&token)?;
//! ```

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while signing or verifying claim sets.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Failed to encode a token.
    #[error("Failed to encode token: {message}")]
    Encoding {
        /// Description of the encoding error.
        message: String,
    },

    /// Failed to decode a token (malformed, wrong structure).
    #[error("Failed to decode token: {message}")]
    Decoding {
        /// Description of the decoding error.
        message: String,
    },

    /// The token has expired (`now >= exp`).
    #[error("Token expired")]
    Expired,

    /// The token signature does not verify against the shared secret.
    #[error("Invalid signature")]
    InvalidSignature,

    /// The token claims are invalid (wrong issuer, missing claim).
    #[error("Invalid claims: {message}")]
    InvalidClaims {
        /// Description of why the claims are invalid.
        message: String,
    },
}

impl CodecError {
    /// Creates a new `Encoding` error.
    #[must_use]
    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding {
            message: message.into(),
        }
    }

    /// Creates a new `Decoding` error.
    #[must_use]
    pub fn decoding(message: impl Into<String>) -> Self {
        Self::Decoding {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidClaims` error.
    #[must_use]
    pub fn invalid_claims(message: impl Into<String>) -> Self {
        Self::InvalidClaims {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a validation error rather than a
    /// malformed-input error.
    #[must_use]
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            Self::Expired | Self::InvalidSignature | Self::InvalidClaims { .. }
        )
    }
}

impl From<jsonwebtoken::errors::Error> for CodecError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::InvalidSignature => Self::InvalidSignature,
            ErrorKind::InvalidIssuer
            | ErrorKind::InvalidAudience
            | ErrorKind::InvalidSubject
            | ErrorKind::MissingRequiredClaim(_) => Self::invalid_claims(err.to_string()),
            _ => Self::decoding(err.to_string()),
        }
    }
}

// ============================================================================
// Token Claims
// ============================================================================

/// Claims carried inside a Tradewind access token.
///
/// The `jti` claim ties the claim set to exactly one token record in the
/// issuer's store; the `aud` claim names the single relying client the
/// token is scoped to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessTokenClaims {
    /// Issuer (credential service URL).
    pub iss: String,

    /// Subject (user id, or client id for machine tokens).
    pub sub: String,

    /// Audience (the client id the token was issued to).
    pub aud: String,

    /// Expiration time (Unix timestamp, whole seconds).
    pub exp: i64,

    /// Issued at (Unix timestamp, whole seconds).
    pub iat: i64,

    /// Token identifier, unique per issued token.
    pub jti: String,

    /// Space-separated scopes.
    pub scope: String,

    /// Username, carried for human subjects only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl AccessTokenClaims {
    /// Creates a new builder for access token claims.
    #[must_use]
    pub fn builder(
        issuer: impl Into<String>,
        subject: impl Into<String>,
        audience: impl Into<String>,
    ) -> AccessTokenClaimsBuilder {
        AccessTokenClaimsBuilder::new(issuer, subject, audience)
    }

    /// Returns `true` if the claims are expired at `now`.
    ///
    /// The comparison is strict: `now >= exp` is expired.
    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        now.unix_timestamp() >= self.exp
    }
}

/// Builder for `AccessTokenClaims`.
pub struct AccessTokenClaimsBuilder {
    iss: String,
    sub: String,
    aud: String,
    exp: i64,
    iat: i64,
    jti: String,
    scope: String,
    username: Option<String>,
}

impl AccessTokenClaimsBuilder {
    fn new(issuer: impl Into<String>, subject: impl Into<String>, audience: impl Into<String>) -> Self {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        Self {
            iss: issuer.into(),
            sub: subject.into(),
            aud: audience.into(),
            exp: now + 3600,
            iat: now,
            jti: uuid::Uuid::new_v4().to_string(),
            scope: String::new(),
            username: None,
        }
    }

    /// Sets the expiration time in seconds from issuance.
    #[must_use]
    pub fn expires_in_seconds(mut self, seconds: i64) -> Self {
        self.exp = self.iat + seconds;
        self
    }

    /// Sets the issued-at timestamp (and shifts `exp` to preserve lifetime).
    #[must_use]
    pub fn issued_at(mut self, iat: i64) -> Self {
        let lifetime = self.exp - self.iat;
        self.iat = iat;
        self.exp = iat + lifetime;
        self
    }

    /// Sets the token identifier.
    #[must_use]
    pub fn jti(mut self, jti: impl Into<String>) -> Self {
        self.jti = jti.into();
        self
    }

    /// Sets the scopes.
    #[must_use]
    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Sets the username claim.
    #[must_use]
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Builds the access token claims.
    #[must_use]
    pub fn build(self) -> AccessTokenClaims {
        AccessTokenClaims {
            iss: self.iss,
            sub: self.sub,
            aud: self.aud,
            exp: self.exp,
            iat: self.iat,
            jti: self.jti,
            scope: self.scope,
            username: self.username,
        }
    }
}

// ============================================================================
// Token Codec
// ============================================================================

/// Codec for signing and verifying access token claim sets.
///
/// Purely functional given the shared secret; thread-safe and shareable
/// across async tasks.
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
}

impl TokenCodec {
    /// Creates a new codec over the shared symmetric secret.
    ///
    /// # Arguments
    ///
    /// * `secret` - The deployment-wide signing secret
    /// * `issuer` - The issuer claim value (the credential service URL)
    #[must_use]
    pub fn new(secret: &[u8], issuer: impl Into<String>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            issuer: issuer.into(),
        }
    }

    /// Encodes claims into a compact signed token string.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn sign(&self, claims: &AccessTokenClaims) -> Result<String, CodecError> {
        let header = Header::new(Algorithm::HS256);
        encode(&header, claims, &self.encoding_key).map_err(|e| CodecError::encoding(e.to_string()))
    }

    /// Decodes a token string, checking the signature, issuer and expiry.
    ///
    /// Expiry is checked with zero leeway: `now >= exp` fails with
    /// `CodecError::Expired`. A bad signature fails with
    /// `CodecError::InvalidSignature` so callers can log and act on the
    /// two cases differently.
    ///
    /// # Errors
    ///
    /// Returns an error if decoding or validation fails.
    pub fn verify(&self, token: &str) -> Result<AccessTokenClaims, CodecError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.validate_exp = true;
        validation.leeway = 0;
        validation.validate_aud = false; // audience is checked at the pipeline layer

        decode::<AccessTokenClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(CodecError::from)
    }

    /// Returns the issuer URL.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }
}

// ============================================================================
// Tests
// ============================================================================
