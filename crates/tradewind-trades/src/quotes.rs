//! Client for the upstream price feed.
//!
//! Outbound calls present this service's own machine token, served from
//! the machine credential cache.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use tradewind_auth::AuthResult;
use tradewind_auth::error::AuthError;
use tradewind_auth::machine::MachineTokenCache;

/// The subset of a quote this service reads.
#[derive(Debug, Clone, Deserialize)]
pub struct QuoteView {
    /// Price value.
    pub value: f64,
}

/// HTTP client for the price feed service.
pub struct QuotesClient {
    http: reqwest::Client,
    base_url: String,
    machine: Arc<MachineTokenCache>,
}

impl QuotesClient {
    /// Creates a new client.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        machine: Arc<MachineTokenCache>,
    ) -> AuthResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            machine,
        })
    }

    /// Fetches the lowest quote in the feed's lookback window.
    ///
    /// # Errors
    ///
    /// Returns `Upstream` when the machine token cannot be obtained or
    /// the feed call fails.
    pub async fn lowest_price(&self) -> AuthResult<f64> {
        let token = self.machine.token().await?;

        let response = self
            .http
            .get(format!("{}/quotes/lowest", self.base_url))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AuthError::upstream(format!("quote lookup failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AuthError::upstream(format!(
                "quote lookup returned status {}",
                response.status()
            )));
        }

        let quote: QuoteView = response
            .json()
            .await
            .map_err(|e| AuthError::upstream(format!("bad quote response: {e}")))?;
        Ok(quote.value)
    }
}
