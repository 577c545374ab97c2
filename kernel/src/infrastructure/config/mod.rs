//! Configuration management for the conservation kernel.
//!
//! This module provides structured configuration for the server, database,
//! telemetry, access tokens and the versioning engine. Values are layered:
//! built-in defaults, then an optional `conservation.toml`, then environment
//! variables prefixed with `CONSERVATION__`.
//!
//! # Example
//!
//! ```no_run
//! use conservation_kernel::infrastructure::config::Settings;
//!
//! let settings = Settings::new().expect("Failed to load configuration");
//! ```

pub mod auth;
pub mod database;
pub mod server;
pub mod telemetry;
pub mod versioning;

pub use auth::AuthSettings;
pub use database::DatabaseSettings;
pub use server::ServerSettings;
pub use telemetry::TelemetrySettings;
pub use versioning::VersioningSettings;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Name of the optional configuration file, without extension.
pub const CONFIG_FILE: &str = "conservation";

/// Prefix of environment variable overrides.
pub const ENV_PREFIX: &str = "CONSERVATION";

/// Top-level configuration for the conservation kernel.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    /// Server settings.
    pub server: ServerSettings,
    /// Telemetry settings.
    pub telemetry: TelemetrySettings,
    /// Database settings.
    pub database: DatabaseSettings,
    /// Access token settings.
    pub auth: AuthSettings,
    /// Versioning engine settings.
    #[serde(default)]
    pub versioning: VersioningSettings,
}

impl Settings {
    /// Creates a new settings instance from the config file, environment
    /// variables and defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be built or deserialized.
    pub fn new() -> Result<Self, ConfigError> {
        Self::load(Some(CONFIG_FILE), None)
    }

    /// Builds settings from an optional file and an optional explicit
    /// environment map. `None` for `env` reads the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be built or deserialized.
    pub fn load(
        file: Option<&str>,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 9090)?
            .set_default("server.base_path", server::default_base_path())?
            .set_default("telemetry.service_name", "conservation-kernel")?
            .set_default("telemetry.log_level", telemetry::default_log_level())?
            .set_default("telemetry.sampling_ratio", telemetry::default_sampling())?
            .set_default("database.url", "sqlite://conservation.db")?
            .set_default(
                "database.max_connections",
                i64::from(database::default_max_connections()),
            )?;

        if let Some(name) = file {
            builder = builder.add_source(File::with_name(name).required(false));
        }

        let s = builder
            // Merge in Environment variables
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .source(env),
            )
            .build()?;

        s.try_deserialize()
    }

    /// Address the HTTP server binds to.
    #[must_use]
    pub fn bind_address(&self) -> BindAddress {
        BindAddress(self.server.host.clone(), self.server.port)
    }
}

/// Helper for strong typing addresses
pub struct BindAddress(pub String, pub u16);

impl BindAddress {
    /// Converts the bind address to a `SocketAddr`.
    ///
    /// # Errors
    ///
    /// Returns an error if the IP address string cannot be parsed.
    pub fn to_socket_addr(&self) -> anyhow::Result<std::net::SocketAddr> {
        let ip = self
            .0
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid IP address '{}': {e}", self.0))?;
        Ok(std::net::SocketAddr::new(ip, self.1))
    }
}
