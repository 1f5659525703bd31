//! Price feed service configuration.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use tradewind_auth::config::ValidatorSettings;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "TRADEWIND_QUOTES_CONFIG";

/// Default config file path.
pub const DEFAULT_CONFIG_PATH: &str = "tradewind-quotes.toml";

/// Root configuration for the price feed service.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP listener settings.
    pub server: ServerConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Validation pipeline settings.
    pub validator: ValidatorSettings,
    /// Price generation settings.
    pub quotes: QuotesConfig,
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
        if self.quotes.generate_interval.is_zero() {
            return Err("quotes.generate_interval must be > 0".into());
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
            port: 8081,
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

/// Price generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuotesConfig {
    /// Interval between generated prices.
    #[serde(with = "humantime_serde")]
    pub generate_interval: Duration,

    /// How long quotes stay queryable.
    #[serde(with = "humantime_serde")]
    pub retention: Duration,
}

impl Default for QuotesConfig {
    fn default() -> Self {
        Self {
            generate_interval: Duration::from_secs(60),
            retention: Duration::from_secs(24 * 3600),
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
