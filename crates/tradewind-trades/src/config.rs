//! Trade ledger service configuration.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use tradewind_auth::config::{MachineTokenSettings, ValidatorSettings};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "TRADEWIND_TRADES_CONFIG";

/// Default config file path.
pub const DEFAULT_CONFIG_PATH: &str = "tradewind-trades.toml";

/// Root configuration for the trade ledger service.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP listener settings.
    pub server: ServerConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Validation pipeline settings.
    pub validator: ValidatorSettings,
    /// This service's own machine credential.
    pub machine: MachineTokenSettings,
    /// Upstream price feed settings.
    pub quotes: QuotesUpstreamConfig,
}

impl AppConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns a human-readable description of the first invalid value.
    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        self.validator
            .validate()
            .map_err(|e| format!("validator config error: {e}"))?;
        self.machine
            .validate()
            .map_err(|e| format!("machine config error: {e}"))?;
        if self.quotes.base_url.is_empty() {
            return Err("quotes.base_url must not be empty".into());
        }
        Ok(())
    }

    /// Returns the socket address to bind.
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        let host: IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
        SocketAddr::from((host, self.server.port))
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8082,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter; `RUST_LOG` overrides when set.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Upstream price feed settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuotesUpstreamConfig {
    /// Base URL of the price feed service.
    pub base_url: String,

    /// Bound on the quote lookup round-trip.
    #[serde(with = "humantime_serde")]
    pub request_timeout: std::time::Duration,
}

impl Default for QuotesUpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8081".to_string(),
            request_timeout: std::time::Duration::from_secs(5),
        }
    }
}

/// Loads configuration from `--config`, the environment or the default
/// path; a missing default file falls back to defaults.
///
/// # Errors
///
/// Returns a human-readable description of the failure.
pub fn load_config() -> Result<AppConfig, String> {
    let path = std::env::args()
        .skip(1)
        .collect::<Vec<_>>()
        .windows(2)
        .find(|w| w[0] == "--config")
        .map(|w| w[1].clone())
        .or_else(|| std::env::var(CONFIG_ENV).ok().filter(|p| !p.is_empty()));

    match path {
        Some(path) => {
            let raw = std::fs::read_to_string(&path)
                .map_err(|e| format!("failed to read {path}: {e}"))?;
            toml::from_str(&raw).map_err(|e| format!("failed to parse {path}: {e}"))
        }
        None => match std::fs::read_to_string(DEFAULT_CONFIG_PATH) {
            Ok(raw) => toml::from_str(&raw)
                .map_err(|e| format!("failed to parse {DEFAULT_CONFIG_PATH}: {e}")),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
            Err(e) => Err(format!("failed to read {DEFAULT_CONFIG_PATH}: {e}")),
        },
    }
}
