//! Startup seeding of clients and users.
//!
//! Seeding is idempotent: identifiers that already exist are left
//! untouched so restarts never clobber rotated secrets.

use std::sync::Arc;

use tracing::{info, warn};

use tradewind_auth::store::{ClientStore, UserStore};

use crate::config::BootstrapConfig;

/// Seeds the configured clients and users.
///
/// # Errors
///
/// Returns a human-readable description of the first hard failure.
/// Already-existing identifiers are skipped, not errors.
pub async fn seed(
    config: &BootstrapConfig,
    clients: &Arc<dyn ClientStore>,
    users: &Arc<dyn UserStore>,
) -> Result<(), String> {
    for seed in config.clients.clone() {
        let client_id = seed.client_id.clone();
        if clients
            .find_by_client_id(&client_id)
            .await
            .map_err(|e| format!("client lookup failed: {e}"))?
            .is_some()
        {
            info!(client_id = %client_id, "Client already exists, skipping");
            continue;
        }
        let client = seed.into_client()?;
        clients
            .create(&client)
            .await
            .map_err(|e| format!("failed to seed client '{client_id}': {e}"))?;
        info!(client_id = %client_id, "Seeded client");
    }

    for seed in config.users.clone() {
        let username = seed.username.clone();
        if users
            .find_by_username(&username)
            .await
            .map_err(|e| format!("user lookup failed: {e}"))?
            .is_some()
        {
            info!(username = %username, "User already exists, skipping");
            continue;
        }
        let user = seed.into_user()?;
        if let Err(e) = users.create(&user).await {
            // A create race with another seeding pass is harmless.
            warn!(username = %username, error = %e, "User seeding skipped");
            continue;
        }
        info!(username = %username, "Seeded user");
    }

    Ok(())
}
