//! Database configuration for the conservation kernel.
//!
//! This module defines database connection settings.

use secrecy::SecretString;
use serde::Deserialize;

/// Database connection settings.
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseSettings {
    /// Database connection URL.
    pub url: SecretString,
    /// Upper bound on pooled connections. In-memory databases always use one.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

pub(super) fn default_max_connections() -> u32 {
    8
}
