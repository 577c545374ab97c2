//! Commit store: ordered, append-biased log of commits per branch line.
//!
//! Order assignment happens inside the `INSERT` statement so reading the
//! current maximum and writing the next value is a single atomic step. The
//! `UNIQUE (branch_slug, commit_order)` constraint backs it up; violations
//! are retried with a fresh slug.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use tracing::{debug, instrument, warn};

use super::column::{COMMIT_COLUMNS, commit_cols};
use super::{StoreError, format_timestamp, is_unique_violation, now, parse_timestamp};
use crate::branch_manager::types::{Commit, CommitDraft, Slug};

/// Order of the commit written together with a new branch.
pub const INITIAL_ORDER: i64 = 0;

fn encode_features(draft: &CommitDraft) -> Result<Option<String>, StoreError> {
    draft
        .features
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(StoreError::from)
}

fn map_commit(row: &SqliteRow) -> Result<Commit, StoreError> {
    let features: Option<String> = row.try_get(commit_cols::FEATURES)?;
    let features = features
        .map(|raw| serde_json::from_str(&raw))
        .transpose()?;
    let created_at: String = row.try_get(commit_cols::CREATED_AT)?;
    let updated_at: String = row.try_get(commit_cols::UPDATED_AT)?;

    Ok(Commit {
        slug: Slug::from_trusted(row.try_get(commit_cols::SLUG)?),
        branch_slug: Slug::from_trusted(row.try_get(commit_cols::BRANCH_SLUG)?),
        note: row.try_get(commit_cols::NOTE)?,
        features,
        order: row.try_get(commit_cols::ORDER)?,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

/// Insert the order-0 commit that opens a new branch line.
///
/// # Errors
///
/// Returns `Conflict` if every attempt collides on a unique constraint, or a
/// database error otherwise.
#[instrument(skip(conn, draft), fields(line = %line))]
pub async fn insert_initial(
    conn: &mut SqliteConnection,
    line: &Slug,
    draft: &CommitDraft,
    max_attempts: u32,
) -> Result<Commit, StoreError> {
    let features = encode_features(draft)?;

    for attempt in 1..=max_attempts.max(1) {
        let slug = Slug::generate();
        let stamp = now();
        let ts = format_timestamp(&stamp);

        let result = sqlx::query(
            "INSERT INTO commits (slug, branch_slug, note, features, commit_order, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(slug.as_str())
        .bind(line.as_str())
        .bind(draft.note.as_deref())
        .bind(features.as_deref())
        .bind(INITIAL_ORDER)
        .bind(&ts)
        .bind(&ts)
        .execute(&mut *conn)
        .await;

        match result {
            Ok(_) => {
                return Ok(Commit {
                    slug,
                    branch_slug: line.clone(),
                    note: draft.note.clone(),
                    features: draft.features.clone(),
                    order: INITIAL_ORDER,
                    created_at: stamp,
                    updated_at: stamp,
                });
            }
            Err(e) if is_unique_violation(&e) => {
                warn!(attempt, "Initial commit collided, retrying");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(StoreError::Conflict(format!(
        "could not open line {line} after {max_attempts} attempts"
    )))
}

/// Append a commit to `line` with order `max(order) + 1`, or `1` on an empty
/// line. The line does not need to exist beforehand.
///
/// # Errors
///
/// Returns `Conflict` if every attempt collides on a unique constraint, or a
/// database error otherwise.
#[instrument(skip(conn, draft), fields(line = %line))]
pub async fn append(
    conn: &mut SqliteConnection,
    line: &Slug,
    draft: &CommitDraft,
    max_attempts: u32,
) -> Result<Commit, StoreError> {
    let features = encode_features(draft)?;

    for attempt in 1..=max_attempts.max(1) {
        let slug = Slug::generate();
        let stamp = now();
        let ts = format_timestamp(&stamp);

        let result: Result<i64, sqlx::Error> = sqlx::query_scalar(
            "INSERT INTO commits (slug, branch_slug, note, features, commit_order, created_at, updated_at) \
             SELECT ?, ?, ?, ?, COALESCE(MAX(commit_order) + 1, 1), ?, ? \
             FROM commits WHERE branch_slug = ? \
             RETURNING commit_order",
        )
        .bind(slug.as_str())
        .bind(line.as_str())
        .bind(draft.note.as_deref())
        .bind(features.as_deref())
        .bind(&ts)
        .bind(&ts)
        .bind(line.as_str())
        .fetch_one(&mut *conn)
        .await;

        match result {
            Ok(order) => {
                debug!(order, "Commit appended");
                return Ok(Commit {
                    slug,
                    branch_slug: line.clone(),
                    note: draft.note.clone(),
                    features: draft.features.clone(),
                    order,
                    created_at: stamp,
                    updated_at: stamp,
                });
            }
            Err(e) if is_unique_violation(&e) => {
                warn!(attempt, "Commit order collided, retrying");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(StoreError::Conflict(format!(
        "could not append to line {line} after {max_attempts} attempts"
    )))
}

/// The commit with the highest order on `line`, if any.
///
/// # Errors
///
/// Returns an error if the query fails or the row is corrupt.
#[instrument(skip(conn), fields(line = %line))]
pub async fn latest(conn: &mut SqliteConnection, line: &Slug) -> Result<Option<Commit>, StoreError> {
    let sql = format!(
        "SELECT {COMMIT_COLUMNS} FROM commits WHERE branch_slug = ? \
         ORDER BY commit_order DESC LIMIT 1"
    );
    sqlx::query(&sql)
        .bind(line.as_str())
        .fetch_optional(&mut *conn)
        .await?
        .as_ref()
        .map(map_commit)
        .transpose()
}

/// Every commit on `line`, newest first.
///
/// # Errors
///
/// Returns an error if the query fails or a row is corrupt.
#[instrument(skip(conn), fields(line = %line))]
pub async fn history(conn: &mut SqliteConnection, line: &Slug) -> Result<Vec<Commit>, StoreError> {
    let sql = format!(
        "SELECT {COMMIT_COLUMNS} FROM commits WHERE branch_slug = ? ORDER BY commit_order DESC"
    );
    sqlx::query(&sql)
        .bind(line.as_str())
        .fetch_all(&mut *conn)
        .await?
        .iter()
        .map(map_commit)
        .collect()
}

/// Look up a single commit by slug.
///
/// # Errors
///
/// Returns an error if the query fails or the row is corrupt.
#[instrument(skip(conn), fields(slug = %slug))]
pub async fn find(conn: &mut SqliteConnection, slug: &Slug) -> Result<Option<Commit>, StoreError> {
    let sql = format!("SELECT {COMMIT_COLUMNS} FROM commits WHERE slug = ?");
    sqlx::query(&sql)
        .bind(slug.as_str())
        .fetch_optional(&mut *conn)
        .await?
        .as_ref()
        .map(map_commit)
        .transpose()
}

/// Delete every commit on `line` with order strictly greater than
/// `threshold`. Returns the number of commits removed.
///
/// # Errors
///
/// Returns an error if the delete fails.
#[instrument(skip(conn), fields(line = %line))]
pub async fn truncate_after(
    conn: &mut SqliteConnection,
    line: &Slug,
    threshold: i64,
) -> Result<u64, StoreError> {
    let removed = sqlx::query("DELETE FROM commits WHERE branch_slug = ? AND commit_order > ?")
        .bind(line.as_str())
        .bind(threshold)
        .execute(&mut *conn)
        .await?
        .rows_affected();

    debug!(removed, threshold, "Line truncated");
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{connect, migrate};
    use anyhow::Result;
    use serde_json::json;

    async fn setup() -> Result<sqlx::SqlitePool> {
        let pool = connect("sqlite::memory:", 1).await?;
        migrate(&pool, "schweinfurthii").await?;
        Ok(pool)
    }

    fn draft(note: &str) -> CommitDraft {
        CommitDraft::new(Some(note.to_string()), Some(json!({"type": "FeatureCollection"})))
    }

    #[tokio::test]
    async fn test_append_to_empty_line_starts_at_one() -> Result<()> {
        let pool = setup().await?;
        let mut conn = pool.acquire().await?;
        let line = Slug::trunk();

        let first = append(&mut conn, &line, &draft("a"), 3).await?;
        let second = append(&mut conn, &line, &draft("b"), 3).await?;

        assert_eq!(first.order, 1);
        assert_eq!(second.order, 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_initial_then_append() -> Result<()> {
        let pool = setup().await?;
        let mut conn = pool.acquire().await?;
        let line = Slug::generate();

        let initial = insert_initial(&mut conn, &line, &draft("init"), 3).await?;
        let next = append(&mut conn, &line, &draft("edit"), 3).await?;

        assert_eq!(initial.order, 0);
        assert_eq!(next.order, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_latest_and_history() -> Result<()> {
        let pool = setup().await?;
        let mut conn = pool.acquire().await?;
        let line = Slug::generate();

        assert!(latest(&mut conn, &line).await?.is_none());
        assert!(history(&mut conn, &line).await?.is_empty());

        insert_initial(&mut conn, &line, &draft("0"), 3).await?;
        append(&mut conn, &line, &draft("1"), 3).await?;
        let tip = append(&mut conn, &line, &draft("2"), 3).await?;

        let found = latest(&mut conn, &line).await?.expect("tip exists");
        assert_eq!(found, tip);

        let orders: Vec<i64> = history(&mut conn, &line)
            .await?
            .iter()
            .map(|c| c.order)
            .collect();
        assert_eq!(orders, vec![2, 1, 0]);
        Ok(())
    }

    #[tokio::test]
    async fn test_truncate_after() -> Result<()> {
        let pool = setup().await?;
        let mut conn = pool.acquire().await?;
        let line = Slug::generate();

        insert_initial(&mut conn, &line, &draft("0"), 3).await?;
        for i in 1..=4 {
            append(&mut conn, &line, &draft(&i.to_string()), 3).await?;
        }

        let removed = truncate_after(&mut conn, &line, 1).await?;
        assert_eq!(removed, 3);

        let orders: Vec<i64> = history(&mut conn, &line)
            .await?
            .iter()
            .map(|c| c.order)
            .collect();
        assert_eq!(orders, vec![1, 0]);

        let next = append(&mut conn, &line, &draft("again"), 3).await?;
        assert_eq!(next.order, 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_null_payload_round_trip() -> Result<()> {
        let pool = setup().await?;
        let mut conn = pool.acquire().await?;
        let line = Slug::generate();

        let commit = append(&mut conn, &line, &CommitDraft::default(), 3).await?;
        let found = find(&mut conn, &commit.slug).await?.expect("commit exists");

        assert_eq!(found.note, None);
        assert_eq!(found.features, None);
        assert_eq!(found.created_at, commit.created_at);
        Ok(())
    }

    #[tokio::test]
    async fn test_lines_are_independent() -> Result<()> {
        let pool = setup().await?;
        let mut conn = pool.acquire().await?;
        let a = Slug::generate();
        let b = Slug::generate();

        append(&mut conn, &a, &draft("a1"), 3).await?;
        append(&mut conn, &a, &draft("a2"), 3).await?;
        let b1 = append(&mut conn, &b, &draft("b1"), 3).await?;

        assert_eq!(b1.order, 1);
        assert_eq!(history(&mut conn, &a).await?.len(), 2);
        Ok(())
    }
}
