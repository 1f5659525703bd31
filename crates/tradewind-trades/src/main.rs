//! Tradewind trade ledger service.
//!
//! Records trades for authenticated users. Placing a trade consults the
//! price feed for the lowest recent quote (authenticating with this
//! service's own machine token) and rejects prices below half of it.

mod config;
mod ledger;
mod observability;
mod quotes;

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use tradewind_auth::codec::TokenCodec;
use tradewind_auth::error::AuthError;
use tradewind_auth::introspection::IntrospectionClient;
use tradewind_auth::machine::{MachineTokenCache, MachineTokenConfig};
use tradewind_auth::middleware::{BearerAuth, ValidatorState};

use config::AppConfig;
use ledger::{Trade, TradeLedger};
use quotes::QuotesClient;

#[derive(Clone)]
struct AppState {
    validator: ValidatorState,
    ledger: Arc<TradeLedger>,
    quotes: Arc<QuotesClient>,
}

impl FromRef<AppState> for ValidatorState {
    fn from_ref(state: &AppState) -> Self {
        state.validator.clone()
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Errors from the trade endpoints.
#[derive(Debug, thiserror::Error)]
enum TradeError {
    /// The trade input is malformed.
    #[error("invalid trade: {0}")]
    InvalidInput(String),

    /// The price is below the allowed floor.
    #[error("price must be at least {floor:.2}")]
    BelowFloor {
        /// The minimum accepted price.
        floor: f64,
    },

    /// An authentication or upstream failure.
    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl IntoResponse for TradeError {
    fn into_response(self) -> Response {
        match self {
            Self::InvalidInput(message) => (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": message })),
            )
                .into_response(),
            Self::BelowFloor { floor } => (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({
                    "error": format!("price must be at least {floor:.2}")
                })),
            )
                .into_response(),
            Self::Auth(e) => e.into_response(),
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Trade placement request body.
#[derive(Debug, Deserialize)]
struct TradeInput {
    price: f64,
    quantity: u32,
}

async fn place_trade(
    BearerAuth(auth): BearerAuth,
    State(state): State<AppState>,
    Json(input): Json<TradeInput>,
) -> Result<(StatusCode, Json<Trade>), TradeError> {
    if !input.price.is_finite() || input.price <= 0.0 {
        return Err(TradeError::InvalidInput("price must be positive".into()));
    }
    if input.quantity == 0 {
        return Err(TradeError::InvalidInput("quantity must be positive".into()));
    }

    let lowest = state.quotes.lowest_price().await.map_err(|e| {
        warn!(error = %e, "Lowest quote lookup failed");
        TradeError::Auth(e)
    })?;

    let floor = lowest / 2.0;
    if input.price < floor {
        return Err(TradeError::BelowFloor { floor });
    }

    let trade = state
        .ledger
        .record(auth.subject(), input.price, input.quantity);
    info!(
        user_id = %trade.user_id,
        price = trade.price,
        quantity = trade.quantity,
        "Trade placed"
    );
    Ok((StatusCode::OK, Json(trade)))
}

async fn list_trades(
    BearerAuth(auth): BearerAuth,
    State(state): State<AppState>,
) -> Json<Vec<Trade>> {
    Json(state.ledger.list_for_user(auth.subject()))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

// =============================================================================
// Wiring
// =============================================================================

fn build_state(cfg: &AppConfig) -> Result<AppState, String> {
    let signing_key = std::env::var(tradewind_auth::config::SIGNING_KEY_ENV)
        .map_err(|_| format!("{} is required", tradewind_auth::config::SIGNING_KEY_ENV))?;

    let codec = Arc::new(TokenCodec::new(
        signing_key.as_bytes(),
        &cfg.validator.issuer,
    ));
    let introspection = IntrospectionClient::new(
        &cfg.validator.introspection_url,
        cfg.validator.introspection_timeout,
    )
    .map_err(|e| e.to_string())?;

    let machine = Arc::new(
        MachineTokenCache::new(
            MachineTokenConfig::new(
                &cfg.machine.token_url,
                &cfg.machine.client_id,
                &cfg.machine.client_secret,
            )
            .with_refresh_margin(cfg.machine.refresh_margin)
            .with_request_timeout(cfg.machine.request_timeout),
        )
        .map_err(|e| e.to_string())?,
    );

    let quotes = Arc::new(
        QuotesClient::new(
            &cfg.quotes.base_url,
            cfg.quotes.request_timeout,
            machine,
        )
        .map_err(|e| e.to_string())?,
    );

    Ok(AppState {
        validator: ValidatorState::new(codec, introspection, &cfg.validator.expected_audience),
        ledger: Arc::new(TradeLedger::new()),
        quotes,
    })
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/trades", post(place_trade).get(list_trades))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() {
    if let Err(e) = dotenvy::dotenv() {
        if !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            eprintln!("Warning: failed to load .env file: {e}");
        }
    }

    observability::init_tracing();

    let cfg = match config::load_config().and_then(|c| c.validate().map(|()| c)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    };
    observability::apply_logging_level(&cfg.logging.level);

    let state = match build_state(&cfg) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Startup error: {e}");
            std::process::exit(2);
        }
    };

    let app = router(state);
    let addr = cfg.addr();
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Failed to bind {addr}: {e}");
            std::process::exit(2);
        }
    };
    info!(%addr, "Trade ledger service listening");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
    {
        eprintln!("Server error: {e}");
    }
}
