//! Credential issuance, validation and introspection for Tradewind
//! services.
//!
//! This crate is the shared core of the Tradewind suite:
//!
//! - [`codec`] - signed claim sets over one deployment-wide secret
//! - [`issuer`] - password and client-credentials grant flows
//! - [`store`] - token record and principal storage
//! - [`introspection`] / [`revocation`] - token liveness and invalidation
//! - [`middleware`] - the per-request validation pipeline for resource
//!   services
//! - [`machine`] - the cached machine credential a calling service
//!   presents on outbound requests
//!
//! The credential service binary wires the issuing side together; each
//! resource service uses the middleware and, when it makes outbound
//! calls, the machine credential cache.

pub mod codec;
pub mod config;
pub mod error;
pub mod introspection;
pub mod issuer;
pub mod machine;
pub mod middleware;
pub mod oauth;
pub mod revocation;
pub mod secret;
pub mod store;
pub mod types;

pub use error::AuthError;

/// Result alias for credential operations.
pub type AuthResult<T> = Result<T, AuthError>;
