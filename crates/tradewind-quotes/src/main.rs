//! Tradewind price feed service.
//!
//! Publishes a random price on a fixed interval and serves the latest
//! and lowest quotes to authenticated callers. Every request passes the
//! full validation pipeline: local signature check, remote introspection
//! against the credential service, then the audience check.

mod board;
mod config;
mod observability;

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{FromRef, State},
    routing::get,
};
use rand::Rng;
use time::Duration;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use tradewind_auth::codec::TokenCodec;
use tradewind_auth::error::AuthError;
use tradewind_auth::introspection::IntrospectionClient;
use tradewind_auth::middleware::{BearerAuth, ValidatorState};

use board::{Quote, QuoteBoard};
use config::AppConfig;

#[derive(Clone)]
struct AppState {
    validator: ValidatorState,
    board: Arc<QuoteBoard>,
}

impl FromRef<AppState> for ValidatorState {
    fn from_ref(state: &AppState) -> Self {
        state.validator.clone()
    }
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

    spawn_price_generator(Arc::clone(&state.board), cfg.quotes.generate_interval);

    let app = router(state);
    let addr = cfg.addr();
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Failed to bind {addr}: {e}");
            std::process::exit(2);
        }
    };
    info!(%addr, "Price feed service listening");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
    {
        eprintln!("Server error: {e}");
    }
}

fn build_state(cfg: &AppConfig) -> Result<AppState, String> {
    // Validators share the issuer's signing secret, supplied through the
    // same environment variable as on the credential service.
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

    let retention = Duration::try_from(cfg.quotes.retention)
        .map_err(|e| format!("quotes.retention out of range: {e}"))?;

    Ok(AppState {
        validator: ValidatorState::new(codec, introspection, &cfg.validator.expected_audience),
        board: Arc::new(QuoteBoard::new(retention)),
    })
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/quotes/latest", get(latest_quote))
        .route("/quotes/lowest", get(lowest_quote))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn spawn_price_generator(board: Arc<QuoteBoard>, interval: std::time::Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let value = {
                let mut rng = rand::thread_rng();
                f64::from(rng.gen_range(0..10_000)) + rng.r#gen::<f64>()
            };
            let quote = board.publish(value);
            debug!(value = quote.value, "Generated price");
        }
    });
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn latest_quote(
    BearerAuth(auth): BearerAuth,
    State(state): State<AppState>,
) -> Result<Json<Quote>, AuthError> {
    debug!(subject = %auth.subject(), "Serving latest quote");
    state
        .board
        .latest()
        .map(Json)
        .ok_or_else(|| AuthError::storage("no quotes available yet"))
}

async fn lowest_quote(
    BearerAuth(auth): BearerAuth,
    State(state): State<AppState>,
) -> Result<Json<Quote>, AuthError> {
    debug!(subject = %auth.subject(), "Serving lowest quote");
    state
        .board
        .lowest_within(Duration::hours(24))
        .map(Json)
        .ok_or_else(|| AuthError::storage("no quotes available yet"))
}
