//! Request validation middleware for resource services.
//!
//! Every protected request passes three ordered, short-circuiting checks:
//!
//! 1. Local verification - codec signature and expiry check, no network
//! 2. Liveness check - the issuer's introspection endpoint (catches
//!    revocation, which signature verification cannot)
//! 3. Audience check - the claim set's audience must equal the service's
//!    own configured client identifier
//!
//! On success the caller's principal identity is attached to the request
//! as an [`AuthContext`].

mod auth;
mod context;
mod error;

pub use auth::{BearerAuth, ValidatorState};
pub use context::AuthContext;
