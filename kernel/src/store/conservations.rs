//! Conservation datasets that branches edit.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use tracing::instrument;

use super::{StoreError, format_timestamp, now, parse_timestamp};

/// A conservation dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Conservation {
    /// Dataset slug referenced by `Branch::conservation_slug`.
    pub slug: String,
    /// Display name.
    pub name: String,
    /// Free-text description.
    pub description: String,
    /// Registration timestamp.
    pub created_at: DateTime<Utc>,
}

fn map_conservation(row: &SqliteRow) -> Result<Conservation, StoreError> {
    let created_at: String = row.try_get("created_at")?;
    Ok(Conservation {
        slug: row.try_get("slug")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        created_at: parse_timestamp(&created_at)?,
    })
}

/// Every registered conservation, by slug.
///
/// # Errors
///
/// Returns an error if the query fails.
#[instrument(skip(conn))]
pub async fn list(conn: &mut SqliteConnection) -> Result<Vec<Conservation>, StoreError> {
    sqlx::query("SELECT slug, name, description, created_at FROM conservations ORDER BY slug")
        .fetch_all(&mut *conn)
        .await?
        .iter()
        .map(map_conservation)
        .collect()
}

/// Register a conservation. Existing slugs are left untouched.
///
/// Returns `true` if a row was inserted.
///
/// # Errors
///
/// Returns an error if the write fails.
#[instrument(skip(conn, description))]
pub async fn register(
    conn: &mut SqliteConnection,
    slug: &str,
    name: &str,
    description: &str,
) -> Result<bool, StoreError> {
    let inserted = sqlx::query(
        "INSERT OR IGNORE INTO conservations (slug, name, description, created_at) \
         VALUES (?, ?, ?, ?)",
    )
    .bind(slug)
    .bind(name)
    .bind(description)
    .bind(format_timestamp(&now()))
    .execute(&mut *conn)
    .await?
    .rows_affected();

    Ok(inserted > 0)
}
