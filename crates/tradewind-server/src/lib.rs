//! Tradewind credential service.
//!
//! Issues, revokes and introspects bearer credentials for the Tradewind
//! service suite. See the `tradewind-auth` crate for the underlying
//! issuance and validation machinery.

pub mod bootstrap;
pub mod config;
pub mod observability;
pub mod routes;
pub mod state;

use std::sync::Arc;
use std::time::Duration as StdDuration;

use axum::Router;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use tradewind_auth::codec::TokenCodec;
use tradewind_auth::introspection::IntrospectionService;
use tradewind_auth::issuer::{IssuerConfig, TokenIssuer};
use tradewind_auth::revocation::RevocationService;
use tradewind_auth::store::memory::{MemoryClientStore, MemoryTokenStore, MemoryUserStore};
use tradewind_auth::store::{ClientStore, TokenRecordStore, UserStore};

pub use config::AppConfig;
pub use state::AppState;

/// Builds the application state from configuration.
///
/// Resolves the signing secret, wires the stores, issuer and services,
/// and runs bootstrap seeding.
///
/// # Errors
///
/// Returns a human-readable error; callers treat this as fatal at
/// process start.
pub async fn build_state(cfg: &AppConfig) -> Result<AppState, String> {
    let signing_key = cfg
        .auth
        .resolve_signing_key()
        .map_err(|e| e.to_string())?;

    let codec = Arc::new(TokenCodec::new(signing_key.as_bytes(), &cfg.auth.issuer));
    let records: Arc<dyn TokenRecordStore> = Arc::new(MemoryTokenStore::new());
    let users: Arc<dyn UserStore> = Arc::new(MemoryUserStore::new());
    let clients: Arc<dyn ClientStore> = Arc::new(MemoryClientStore::new());

    bootstrap::seed(&cfg.bootstrap, &clients, &users).await?;

    let issuer_config = IssuerConfig::new(&cfg.auth.issuer)
        .with_default_scope(&cfg.auth.default_scope)
        .with_access_token_lifetime(to_time_duration(cfg.auth.access_token_lifetime)?)
        .with_refresh_token_lifetime(to_time_duration(cfg.auth.refresh_token_lifetime)?)
        .with_refresh_tokens(cfg.auth.issue_refresh_tokens);

    let issuer = Arc::new(TokenIssuer::new(
        Arc::clone(&codec),
        Arc::clone(&users),
        Arc::clone(&records),
        issuer_config,
    ));

    Ok(AppState {
        issuer,
        clients,
        users,
        introspection: Arc::new(IntrospectionService::new(Arc::clone(&records))),
        revocation: Arc::new(RevocationService::new(Arc::clone(&records))),
        records,
        codec,
    })
}

/// Builds the HTTP router over the given state.
#[must_use]
pub fn build_router(state: AppState) -> Router {
    routes::router(state)
}

/// Spawns the fixed-interval garbage-collection sweep over the token
/// record store.
///
/// A sweep failure fails only that pass; the task keeps running.
pub fn spawn_record_sweep(
    records: Arc<dyn TokenRecordStore>,
    interval: StdDuration,
    grace: time::Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick fires immediately; skip it so an empty store is
        // not swept at startup.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match records.collect_expired(grace).await {
                Ok(0) => {}
                Ok(removed) => debug!(removed, "Collected expired token records"),
                Err(e) => warn!(error = %e, "Token record sweep failed"),
            }
        }
    })
}

/// Converts a std duration from config into a `time::Duration`.
fn to_time_duration(value: StdDuration) -> Result<time::Duration, String> {
    time::Duration::try_from(value).map_err(|e| format!("duration out of range: {e}"))
}
