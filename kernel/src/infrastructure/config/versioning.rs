//! Versioning engine settings.

use serde::Deserialize;

use crate::branch_manager::DEFAULT_MAX_INSERT_ATTEMPTS;

/// Versioning engine settings.
#[derive(Debug, Deserialize, Clone)]
pub struct VersioningSettings {
    /// Conservation used when a branch is created without one.
    #[serde(default = "default_conservation")]
    pub default_conservation: String,
    /// Attempts for inserts that collide on a unique constraint.
    #[serde(default = "default_max_insert_attempts")]
    pub max_insert_attempts: u32,
}

impl Default for VersioningSettings {
    fn default() -> Self {
        Self {
            default_conservation: default_conservation(),
            max_insert_attempts: default_max_insert_attempts(),
        }
    }
}

fn default_conservation() -> String {
    "schweinfurthii".to_string()
}

fn default_max_insert_attempts() -> u32 {
    DEFAULT_MAX_INSERT_ATTEMPTS
}
