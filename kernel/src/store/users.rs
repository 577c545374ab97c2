//! User records the access gate resolves callers against.

use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use tracing::instrument;

use super::{StoreError, format_timestamp, now};
use crate::branch_manager::types::Owner;

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// User id, the `uid` claim of access tokens.
    pub id: String,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Contact email.
    pub email: String,
}

impl User {
    /// Snapshot of this user for embedding into a branch.
    #[must_use]
    pub fn to_owner(&self) -> Owner {
        Owner {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            id: self.id.clone(),
        }
    }
}

fn map_user(row: &SqliteRow) -> Result<User, StoreError> {
    Ok(User {
        id: row.try_get("id")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        email: row.try_get("email")?,
    })
}

/// Look up a user by id.
///
/// # Errors
///
/// Returns an error if the query fails.
#[instrument(skip(conn))]
pub async fn find(conn: &mut SqliteConnection, id: &str) -> Result<Option<User>, StoreError> {
    sqlx::query("SELECT id, first_name, last_name, email FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .as_ref()
        .map(map_user)
        .transpose()
}

/// Insert or replace a user record.
///
/// # Errors
///
/// Returns an error if the write fails.
#[instrument(skip(conn, user), fields(id = %user.id))]
pub async fn upsert(conn: &mut SqliteConnection, user: &User) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO users (id, first_name, last_name, email, created_at) VALUES (?, ?, ?, ?, ?) \
         ON CONFLICT(id) DO UPDATE SET first_name = excluded.first_name, \
         last_name = excluded.last_name, email = excluded.email",
    )
    .bind(&user.id)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&user.email)
    .bind(format_timestamp(&now()))
    .execute(&mut *conn)
    .await?;
    Ok(())
}
