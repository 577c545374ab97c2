//! Connection pool setup and idempotent schema creation.

use std::str::FromStr;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use tracing::{info, instrument};

use super::{StoreError, format_timestamp, now};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        email TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS conservations (
        slug TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS branches (
        slug TEXT PRIMARY KEY,
        conservation_slug TEXT NOT NULL,
        owner_id TEXT NOT NULL,
        owner_first_name TEXT NOT NULL,
        owner_last_name TEXT NOT NULL,
        owner_email TEXT NOT NULL,
        note TEXT NOT NULL DEFAULT '',
        status INTEGER NOT NULL DEFAULT 0,
        audit_status INTEGER NOT NULL DEFAULT 0,
        audit_approvals INTEGER NOT NULL DEFAULT 0,
        audit_denials INTEGER NOT NULL DEFAULT 0,
        audit_pending INTEGER NOT NULL DEFAULT 0,
        audit_envelope_id TEXT NOT NULL DEFAULT '',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS commits (
        slug TEXT PRIMARY KEY,
        branch_slug TEXT NOT NULL,
        note TEXT,
        features TEXT,
        commit_order INTEGER NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        UNIQUE (branch_slug, commit_order)
    )",
    "CREATE INDEX IF NOT EXISTS idx_commits_line ON commits (branch_slug, commit_order)",
    "CREATE INDEX IF NOT EXISTS idx_branches_conservation ON branches (conservation_slug)",
];

fn is_in_memory(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

/// Open a connection pool for `url`.
///
/// In-memory databases are pinned to a single long-lived connection so every
/// query sees the same data. File databases run in WAL mode.
///
/// # Errors
///
/// Returns an error if the URL is malformed or the database cannot be opened.
#[instrument(skip(url))]
pub async fn connect(url: &str, max_connections: u32) -> Result<SqlitePool, StoreError> {
    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .busy_timeout(BUSY_TIMEOUT);

    let pool = if is_in_memory(url) {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?
    } else {
        SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options.journal_mode(SqliteJournalMode::Wal))
            .await?
    };

    Ok(pool)
}

/// Create the schema if missing and seed the default conservation.
///
/// # Errors
///
/// Returns an error if any DDL statement fails.
#[instrument(skip(pool))]
pub async fn migrate(pool: &SqlitePool, default_conservation: &str) -> Result<(), StoreError> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }

    let seeded = sqlx::query(
        "INSERT OR IGNORE INTO conservations (slug, name, description, created_at) \
         VALUES (?, ?, '', ?)",
    )
    .bind(default_conservation)
    .bind(default_conservation)
    .bind(format_timestamp(&now()))
    .execute(pool)
    .await?
    .rows_affected();

    info!(
        default_conservation,
        seeded = seeded > 0,
        "Database schema ready"
    );
    Ok(())
}
