//! Server configuration for the conservation kernel.
//!
//! This module defines HTTP server binding and routing settings.

use serde::Deserialize;

/// Server binding settings.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Path the branch routes are nested under.
    #[serde(default = "default_base_path")]
    pub base_path: String,
}

pub(super) fn default_base_path() -> String {
    "/api/branch".to_string()
}
