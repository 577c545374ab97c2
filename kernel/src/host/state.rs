//! Host state management for the conservation kernel.
//!
//! This module provides the `KernelState` struct which bundles the versioning
//! engine and the access gate for the HTTP layer.

use anyhow::{Context, Result};
use secrecy::ExposeSecret;
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::auth::{AccessGate, JwtAccessGate};
use crate::branch_manager::BranchManager;
use crate::infrastructure::config::Settings;
use crate::store;

/// Inner state that can be cheaply cloned via Arc.
struct KernelStateInner {
    branch_manager: BranchManager,
    gate: Arc<dyn AccessGate>,
}

/// The main host state for the conservation kernel.
///
/// It uses an internal `Arc` for cheap cloning and thread-safe sharing.
#[derive(Clone)]
pub struct KernelState {
    inner: Arc<KernelStateInner>,
}

impl std::fmt::Debug for KernelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KernelState")
            .field("branch_manager", &self.inner.branch_manager)
            .finish_non_exhaustive()
    }
}

impl KernelState {
    /// Assemble state from an engine and a gate.
    #[must_use]
    pub fn new(branch_manager: BranchManager, gate: Arc<dyn AccessGate>) -> Self {
        Self {
            inner: Arc::new(KernelStateInner {
                branch_manager,
                gate,
            }),
        }
    }

    /// Connect to the configured database, create the schema and wire the
    /// engine to a JWT access gate.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub async fn from_settings(settings: &Settings) -> Result<Self> {
        let pool = store::connect(
            settings.database.url.expose_secret(),
            settings.database.max_connections,
        )
        .await
        .context("Failed to open database")?;
        store::migrate(&pool, &settings.versioning.default_conservation)
            .await
            .context("Failed to migrate database")?;

        let manager = BranchManager::new(pool.clone(), &settings.versioning.default_conservation)
            .with_max_insert_attempts(settings.versioning.max_insert_attempts);
        let gate = JwtAccessGate::new(pool, &settings.auth.jwt_secret);

        Ok(Self::new(manager, Arc::new(gate)))
    }

    /// Returns the versioning engine.
    #[must_use]
    pub fn branches(&self) -> &BranchManager {
        &self.inner.branch_manager
    }

    /// Returns the access gate.
    #[must_use]
    pub fn gate(&self) -> &dyn AccessGate {
        self.inner.gate.as_ref()
    }

    /// Returns a reference to the database connection pool.
    #[must_use]
    pub fn db(&self) -> &SqlitePool {
        self.inner.branch_manager.pool()
    }
}
