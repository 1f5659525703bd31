//! Credential service configuration.
//!
//! Loaded from a TOML file resolved from `--config`, the
//! `TRADEWIND_AUTH_CONFIG` environment variable, or `tradewind.toml` in
//! the working directory. A missing default file falls back to defaults;
//! an explicitly named file that cannot be read is an error.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use tradewind_auth::config::AuthSettings;
use tradewind_auth::secret::hash_secret;
use tradewind_auth::types::{Client, User};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "TRADEWIND_AUTH_CONFIG";

/// Default config file path.
pub const DEFAULT_CONFIG_PATH: &str = "tradewind.toml";

/// Root configuration for the credential service.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP listener settings.
    pub server: ServerConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Issuer settings (token lifetimes, signing key, GC).
    pub auth: AuthSettings,
    /// Initial data seeded at startup.
    pub bootstrap: BootstrapConfig,
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
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        self.auth
            .validate()
            .map_err(|e| format!("auth config error: {e}"))?;
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
            port: 8080,
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

// =============================================================================
// Bootstrap
// =============================================================================

/// Initial data seeded into the stores at startup.
///
/// Seeding is idempotent: identifiers that already exist are skipped.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Machine clients to provision.
    pub clients: Vec<ClientSeed>,
    /// Users to provision.
    pub users: Vec<UserSeed>,
}

/// One machine client to provision at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSeed {
    /// Client identifier (doubles as token audience).
    pub client_id: String,
    /// Plaintext shared secret; hashed before storage.
    pub secret: String,
    /// Display name. Defaults to the client id.
    #[serde(default)]
    pub name: Option<String>,
}

impl ClientSeed {
    /// Converts the seed into a storable client with a hashed secret.
    ///
    /// # Errors
    ///
    /// Returns an error if secret hashing fails.
    pub fn into_client(self) -> Result<Client, String> {
        let hash = hash_secret(&self.secret).map_err(|e| format!("failed to hash secret: {e}"))?;
        let name = self.name.unwrap_or_else(|| self.client_id.clone());
        Ok(Client::new(self.client_id, hash, name))
    }
}

/// One user to provision at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSeed {
    /// Username.
    pub username: String,
    /// Plaintext password; hashed before storage.
    pub password: String,
}

impl UserSeed {
    /// Converts the seed into a storable user with a hashed password.
    ///
    /// # Errors
    ///
    /// Returns an error if password hashing fails.
    pub fn into_user(self) -> Result<User, String> {
        let hash =
            hash_secret(&self.password).map_err(|e| format!("failed to hash password: {e}"))?;
        Ok(User::new(self.username, hash))
    }
}

// =============================================================================
// Loading
// =============================================================================

/// How the configuration path was determined.
#[derive(Debug, Clone, Copy)]
pub enum ConfigSource {
    /// From `--config` CLI argument.
    CliArgument,
    /// From the `TRADEWIND_AUTH_CONFIG` environment variable.
    EnvironmentVariable,
    /// Default path.
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CliArgument => write!(f, "CLI argument (--config)"),
            Self::EnvironmentVariable => write!(f, "environment variable ({CONFIG_ENV})"),
            Self::Default => write!(f, "default"),
        }
    }
}

/// Resolves the configuration file path from CLI, environment or default.
#[must_use]
pub fn resolve_config_path() -> (String, ConfigSource) {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            if let Some(path) = args.next() {
                return (path, ConfigSource::CliArgument);
            }
        }
    }

    if let Ok(path) = std::env::var(CONFIG_ENV) {
        if !path.is_empty() {
            return (path, ConfigSource::EnvironmentVariable);
        }
    }

    (DEFAULT_CONFIG_PATH.to_string(), ConfigSource::Default)
}

/// Loads configuration from the given path.
///
/// A missing file at the default path falls back to defaults; any other
/// read or parse failure is an error.
///
/// # Errors
///
/// Returns a human-readable description of the failure.
pub fn load_config(path: &str, source: ConfigSource) -> Result<AppConfig, String> {
    match std::fs::read_to_string(path) {
        Ok(raw) => toml::from_str(&raw).map_err(|e| format!("failed to parse {path}: {e}")),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => match source {
            ConfigSource::Default => Ok(AppConfig::default()),
            _ => Err(format!("config file not found: {path}")),
        },
        Err(e) => Err(format!("failed to read {path}: {e}")),
    }
}
