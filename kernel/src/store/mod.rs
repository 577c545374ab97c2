//! SQLite persistence for branches, commits, users and conservations.
//!
//! Every store function takes a `&mut SqliteConnection` so the versioning
//! engine can compose several of them inside one transaction.

pub mod branches;
pub mod column;
pub mod commits;
pub mod conservations;
pub mod schema;
pub mod users;

pub use schema::{connect, migrate};

use chrono::{DateTime, SubsecRound, Utc};

/// Errors that can occur when using the store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database-related error.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),
    /// Feature payload could not be encoded or decoded.
    #[error("Serialization Error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// Unique constraint kept failing after every retry.
    #[error("Conflict: {0}")]
    Conflict(String),
    /// A stored row holds a value the domain model rejects.
    #[error("Corrupt row: {0}")]
    CorruptRow(String),
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// Current time at the precision timestamps are persisted with.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StoreError::CorruptRow(format!("invalid timestamp '{raw}': {e}")))
}
