//! Shared application state for the credential service.

use std::sync::Arc;

use tradewind_auth::codec::TokenCodec;
use tradewind_auth::introspection::IntrospectionService;
use tradewind_auth::issuer::TokenIssuer;
use tradewind_auth::revocation::RevocationService;
use tradewind_auth::store::{ClientStore, TokenRecordStore, UserStore};

/// State shared across all credential service handlers.
#[derive(Clone)]
pub struct AppState {
    /// Grant orchestration.
    pub issuer: Arc<TokenIssuer>,
    /// Client registrations, used to authenticate grant requests.
    pub clients: Arc<dyn ClientStore>,
    /// User registrations.
    pub users: Arc<dyn UserStore>,
    /// Issued token records.
    pub records: Arc<dyn TokenRecordStore>,
    /// Issuer-side introspection.
    pub introspection: Arc<IntrospectionService>,
    /// Issuer-side revocation.
    pub revocation: Arc<RevocationService>,
    /// Claim-set codec, shared with `/auth/me` validation.
    pub codec: Arc<TokenCodec>,
}
