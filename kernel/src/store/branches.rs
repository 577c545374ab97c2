//! Branch registry: branch metadata and status lifecycle.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use tracing::{instrument, warn};

use super::column::{BRANCH_COLUMNS, branch_cols};
use super::{StoreError, format_timestamp, is_unique_violation, now, parse_timestamp};
use crate::branch_manager::types::{AuditState, AuditStatus, Branch, BranchStatus, Owner, Slug};

fn map_branch(row: &SqliteRow) -> Result<Branch, StoreError> {
    let status: i64 = row.try_get(branch_cols::STATUS)?;
    let audit: i64 = row.try_get(branch_cols::AUDIT_STATUS)?;
    let created_at: String = row.try_get(branch_cols::CREATED_AT)?;
    let updated_at: String = row.try_get(branch_cols::UPDATED_AT)?;

    Ok(Branch {
        slug: Slug::from_trusted(row.try_get(branch_cols::SLUG)?),
        conservation_slug: row.try_get(branch_cols::CONSERVATION_SLUG)?,
        owner: Owner {
            first_name: row.try_get(branch_cols::OWNER_FIRST_NAME)?,
            last_name: row.try_get(branch_cols::OWNER_LAST_NAME)?,
            email: row.try_get(branch_cols::OWNER_EMAIL)?,
            id: row.try_get(branch_cols::OWNER_ID)?,
        },
        note: row.try_get(branch_cols::NOTE)?,
        status: BranchStatus::try_from(status).map_err(StoreError::CorruptRow)?,
        audit_status: AuditStatus {
            status: AuditState::try_from(audit).map_err(StoreError::CorruptRow)?,
            approvals: row.try_get(branch_cols::AUDIT_APPROVALS)?,
            denials: row.try_get(branch_cols::AUDIT_DENIALS)?,
            pending: row.try_get(branch_cols::AUDIT_PENDING)?,
            envelope_id: row.try_get(branch_cols::AUDIT_ENVELOPE_ID)?,
        },
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

/// Register a new `Active` branch with a fresh slug and empty audit status.
///
/// # Errors
///
/// Returns `Conflict` if every generated slug collides, or a database error.
#[instrument(skip(conn, owner, note), fields(owner = %owner.id))]
pub async fn insert(
    conn: &mut SqliteConnection,
    owner: &Owner,
    conservation_slug: &str,
    note: &str,
    max_attempts: u32,
) -> Result<Branch, StoreError> {
    for attempt in 1..=max_attempts.max(1) {
        let stamp = now();
        let branch = Branch {
            slug: Slug::generate(),
            conservation_slug: conservation_slug.to_string(),
            owner: owner.clone(),
            note: note.to_string(),
            status: BranchStatus::Active,
            audit_status: AuditStatus::default(),
            created_at: stamp,
            updated_at: stamp,
        };
        let ts = format_timestamp(&branch.created_at);

        let result = sqlx::query(
            "INSERT INTO branches (slug, conservation_slug, owner_id, owner_first_name, \
             owner_last_name, owner_email, note, status, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(branch.slug.as_str())
        .bind(&branch.conservation_slug)
        .bind(&owner.id)
        .bind(&owner.first_name)
        .bind(&owner.last_name)
        .bind(&owner.email)
        .bind(&branch.note)
        .bind(branch.status.code())
        .bind(&ts)
        .bind(&ts)
        .execute(&mut *conn)
        .await;

        match result {
            Ok(_) => return Ok(branch),
            Err(e) if is_unique_violation(&e) => {
                warn!(attempt, "Branch slug collided, retrying");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(StoreError::Conflict(format!(
        "could not allocate a branch slug after {max_attempts} attempts"
    )))
}

/// Look up a branch by slug regardless of status.
///
/// # Errors
///
/// Returns an error if the query fails or the row is corrupt.
#[instrument(skip(conn), fields(slug = %slug))]
pub async fn find(conn: &mut SqliteConnection, slug: &Slug) -> Result<Option<Branch>, StoreError> {
    let sql = format!("SELECT {BRANCH_COLUMNS} FROM branches WHERE slug = ?");
    sqlx::query(&sql)
        .bind(slug.as_str())
        .fetch_optional(&mut *conn)
        .await?
        .as_ref()
        .map(map_branch)
        .transpose()
}

/// Every branch regardless of status, oldest first.
///
/// # Errors
///
/// Returns an error if the query fails or a row is corrupt.
#[instrument(skip(conn))]
pub async fn list(conn: &mut SqliteConnection) -> Result<Vec<Branch>, StoreError> {
    let sql = format!("SELECT {BRANCH_COLUMNS} FROM branches ORDER BY created_at, slug");
    sqlx::query(&sql)
        .fetch_all(&mut *conn)
        .await?
        .iter()
        .map(map_branch)
        .collect()
}

/// Move a branch from `from` to `to` only if it is currently in `from`.
///
/// Returns `false` when no row matched, meaning the branch is missing or
/// another writer changed its status first.
///
/// # Errors
///
/// Returns an error if the update fails.
#[instrument(skip(conn), fields(slug = %slug, from = %from, to = %to))]
pub async fn transition(
    conn: &mut SqliteConnection,
    slug: &Slug,
    from: BranchStatus,
    to: BranchStatus,
) -> Result<bool, StoreError> {
    let affected = sqlx::query(
        "UPDATE branches SET status = ?, updated_at = ? WHERE slug = ? AND status = ?",
    )
    .bind(to.code())
    .bind(format_timestamp(&now()))
    .bind(slug.as_str())
    .bind(from.code())
    .execute(&mut *conn)
    .await?
    .rows_affected();

    Ok(affected > 0)
}

/// Overwrite the audit sub-record of a branch. Returns `false` if the branch
/// does not exist.
///
/// # Errors
///
/// Returns an error if the update fails.
#[instrument(skip(conn, audit), fields(slug = %slug))]
pub async fn update_audit(
    conn: &mut SqliteConnection,
    slug: &Slug,
    audit: &AuditStatus,
) -> Result<bool, StoreError> {
    let affected = sqlx::query(
        "UPDATE branches SET audit_status = ?, audit_approvals = ?, audit_denials = ?, \
         audit_pending = ?, audit_envelope_id = ?, updated_at = ? WHERE slug = ?",
    )
    .bind(i64::from(audit.status))
    .bind(audit.approvals)
    .bind(audit.denials)
    .bind(audit.pending)
    .bind(&audit.envelope_id)
    .bind(format_timestamp(&now()))
    .bind(slug.as_str())
    .execute(&mut *conn)
    .await?
    .rows_affected();

    Ok(affected > 0)
}

/// Replace the audit sub-record only if it still equals `expected`.
///
/// Returns `false` when the branch is missing or its audit state moved on.
///
/// # Errors
///
/// Returns an error if the update fails.
#[instrument(skip(conn, expected, audit), fields(slug = %slug))]
pub async fn replace_audit(
    conn: &mut SqliteConnection,
    slug: &Slug,
    expected: &AuditStatus,
    audit: &AuditStatus,
) -> Result<bool, StoreError> {
    let affected = sqlx::query(
        "UPDATE branches SET audit_status = ?, audit_approvals = ?, audit_denials = ?, \
         audit_pending = ?, audit_envelope_id = ?, updated_at = ? \
         WHERE slug = ? AND audit_status = ? AND audit_approvals = ? AND audit_denials = ? \
         AND audit_pending = ? AND audit_envelope_id = ?",
    )
    .bind(i64::from(audit.status))
    .bind(audit.approvals)
    .bind(audit.denials)
    .bind(audit.pending)
    .bind(&audit.envelope_id)
    .bind(format_timestamp(&now()))
    .bind(slug.as_str())
    .bind(i64::from(expected.status))
    .bind(expected.approvals)
    .bind(expected.denials)
    .bind(expected.pending)
    .bind(&expected.envelope_id)
    .execute(&mut *conn)
    .await?
    .rows_affected();

    Ok(affected > 0)
}
