//! Core versioning engine.
//!
//! This module provides the `BranchManager` which orchestrates operations
//! spanning the branch registry and the commit store. Multi-record writes
//! run inside a single transaction.

use sqlx::SqlitePool;
use tracing::{info, instrument};

use super::types::{
    AuditStatus, Branch, BranchError, BranchStatus, Commit, CommitDraft, CreatedBranch,
    MergeOutcome, Owner, Slug, TRUNK,
};
use crate::infrastructure::audit::{AuditEvent, log_audit};
use crate::infrastructure::metrics;
use crate::store::conservations::Conservation;
use crate::store::{StoreError, branches, commits, conservations};

/// Default number of attempts for inserts that can collide.
pub const DEFAULT_MAX_INSERT_ATTEMPTS: u32 = 5;

/// Versioning engine over a SQLite pool.
#[derive(Debug, Clone)]
pub struct BranchManager {
    pool: SqlitePool,
    default_conservation: String,
    max_insert_attempts: u32,
}

impl BranchManager {
    /// Create a new branch manager.
    #[must_use]
    pub fn new(pool: SqlitePool, default_conservation: impl Into<String>) -> Self {
        Self {
            pool,
            default_conservation: default_conservation.into(),
            max_insert_attempts: DEFAULT_MAX_INSERT_ATTEMPTS,
        }
    }

    /// Override how often colliding inserts are retried.
    #[must_use]
    pub fn with_max_insert_attempts(mut self, attempts: u32) -> Self {
        self.max_insert_attempts = attempts.max(1);
        self
    }

    /// Underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Dataset used when a caller names none.
    #[must_use]
    pub fn default_conservation(&self) -> &str {
        &self.default_conservation
    }

    fn resolve_conservation(&self, requested: Option<&str>) -> Result<String, BranchError> {
        let Some(slug) = requested else {
            return Ok(self.default_conservation.clone());
        };
        let slug = slug.trim();
        if slug.is_empty() {
            return Err(BranchError::Validation(
                "conservationSlug cannot be empty".to_string(),
            ));
        }
        if slug == TRUNK {
            return Err(BranchError::Validation(format!(
                "conservationSlug '{TRUNK}' is reserved"
            )));
        }
        Ok(slug.to_string())
    }

    /// Create a branch together with its order-0 commit.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a reserved or empty conservation slug, or a
    /// store error; in that case neither record is written.
    #[instrument(skip(self, owner, note, initial), fields(owner = %owner.id))]
    pub async fn create(
        &self,
        owner: &Owner,
        conservation_slug: Option<&str>,
        note: &str,
        initial: CommitDraft,
    ) -> Result<CreatedBranch, BranchError> {
        let conservation = self.resolve_conservation(conservation_slug)?;

        let mut tx = self.pool.begin().await?;
        let branch =
            branches::insert(&mut tx, owner, &conservation, note, self.max_insert_attempts)
                .await?;
        let commit =
            commits::insert_initial(&mut tx, &branch.slug, &initial, self.max_insert_attempts)
                .await?;
        tx.commit().await?;

        metrics::branch_created();
        log_audit(&AuditEvent::BranchCreated {
            slug: branch.slug.to_string(),
            owner: owner.id.clone(),
            conservation,
        });
        info!(slug = %branch.slug, "Branch created");

        Ok(CreatedBranch { branch, commit })
    }

    /// Append a commit to `line`. The line is not checked for existence.
    ///
    /// # Errors
    ///
    /// Returns a store error if the append fails.
    #[instrument(skip(self, draft), fields(line = %line))]
    pub async fn commit(&self, line: &Slug, draft: CommitDraft) -> Result<Commit, BranchError> {
        let mut conn = self.pool.acquire().await?;
        let commit = commits::append(&mut conn, line, &draft, self.max_insert_attempts).await?;
        metrics::commit_appended();
        Ok(commit)
    }

    /// Commits of `line`, newest first. An unknown line yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns a store error if the query fails.
    pub async fn history(&self, line: &Slug) -> Result<Vec<Commit>, BranchError> {
        let mut conn = self.pool.acquire().await?;
        Ok(commits::history(&mut conn, line).await?)
    }

    /// Latest commit of `line`.
    ///
    /// # Errors
    ///
    /// Returns a store error if the query fails.
    pub async fn latest(&self, line: &Slug) -> Result<Option<Commit>, BranchError> {
        let mut conn = self.pool.acquire().await?;
        Ok(commits::latest(&mut conn, line).await?)
    }

    /// Look up a branch regardless of status.
    ///
    /// # Errors
    ///
    /// Returns a store error if the query fails.
    pub async fn find(&self, slug: &Slug) -> Result<Option<Branch>, BranchError> {
        let mut conn = self.pool.acquire().await?;
        Ok(branches::find(&mut conn, slug).await?)
    }

    /// Get a branch by slug.
    ///
    /// # Errors
    ///
    /// Returns `BranchNotFound` if no branch has this slug.
    pub async fn get(&self, slug: &Slug) -> Result<Branch, BranchError> {
        self.find(slug)
            .await?
            .ok_or_else(|| BranchError::BranchNotFound(slug.to_string()))
    }

    /// Every branch regardless of status.
    ///
    /// # Errors
    ///
    /// Returns a store error if the query fails.
    pub async fn list(&self) -> Result<Vec<Branch>, BranchError> {
        let mut conn = self.pool.acquire().await?;
        Ok(branches::list(&mut conn).await?)
    }

    /// Every registered conservation dataset.
    ///
    /// # Errors
    ///
    /// Returns a store error if the query fails.
    pub async fn conservations(&self) -> Result<Vec<Conservation>, BranchError> {
        let mut conn = self.pool.acquire().await?;
        Ok(conservations::list(&mut conn).await?)
    }

    /// Soft-delete an `Active` branch. Its commits are kept.
    ///
    /// # Errors
    ///
    /// Returns `BranchNotFound` for an unknown slug and
    /// `InvalidStateTransition` if the branch is merged or already deleted.
    #[instrument(skip(self), fields(slug = %slug))]
    pub async fn delete(&self, slug: &Slug) -> Result<Branch, BranchError> {
        let mut tx = self.pool.begin().await?;
        if !branches::transition(&mut tx, slug, BranchStatus::Active, BranchStatus::Deleted).await? {
            return Err(Self::rejected_transition(&mut tx, slug, BranchStatus::Deleted).await);
        }
        let branch = branches::find(&mut tx, slug)
            .await?
            .ok_or_else(|| BranchError::BranchNotFound(slug.to_string()))?;
        tx.commit().await?;

        metrics::branch_deleted();
        log_audit(&AuditEvent::BranchDeleted {
            slug: slug.to_string(),
        });
        Ok(branch)
    }

    /// Merge the tip of an `Active` branch onto the trunk.
    ///
    /// The branch is marked `Merged` and the trunk receives a commit carrying
    /// the tip's note and features (both `None` for an empty branch), in one
    /// transaction.
    ///
    /// # Errors
    ///
    /// Returns `BranchNotFound` for an unknown slug and
    /// `InvalidStateTransition` if the branch is not `Active`.
    #[instrument(skip(self), fields(slug = %slug))]
    pub async fn merge(&self, slug: &Slug) -> Result<MergeOutcome, BranchError> {
        let mut tx = self.pool.begin().await?;

        if !branches::transition(&mut tx, slug, BranchStatus::Active, BranchStatus::Merged).await? {
            return Err(Self::rejected_transition(&mut tx, slug, BranchStatus::Merged).await);
        }

        let draft = commits::latest(&mut tx, slug)
            .await?
            .as_ref()
            .map(CommitDraft::from)
            .unwrap_or_default();
        let commit =
            commits::append(&mut tx, &Slug::trunk(), &draft, self.max_insert_attempts).await?;
        let branch = branches::find(&mut tx, slug)
            .await?
            .ok_or_else(|| BranchError::BranchNotFound(slug.to_string()))?;

        tx.commit().await?;

        metrics::branch_merged();
        log_audit(&AuditEvent::BranchMerged {
            slug: slug.to_string(),
            commit: commit.slug.to_string(),
            order: commit.order,
        });
        info!(order = commit.order, "Branch merged onto {TRUNK}");

        Ok(MergeOutcome { branch, commit })
    }

    /// Delete a commit and every later commit of the same branch line.
    ///
    /// Returns the number of commits removed.
    ///
    /// # Errors
    ///
    /// Returns `CommitNotFound` for an unknown commit and `BranchNotFound`
    /// when the commit's line has no branch record (the trunk included).
    #[instrument(skip(self), fields(commit = %commit_slug))]
    pub async fn delete_commit(&self, commit_slug: &Slug) -> Result<u64, BranchError> {
        let mut conn = self.pool.acquire().await?;

        let commit = commits::find(&mut conn, commit_slug)
            .await?
            .ok_or_else(|| BranchError::CommitNotFound(commit_slug.to_string()))?;
        if branches::find(&mut conn, &commit.branch_slug).await?.is_none() {
            return Err(BranchError::BranchNotFound(commit.branch_slug.to_string()));
        }

        let removed =
            commits::truncate_after(&mut conn, &commit.branch_slug, commit.order - 1).await?;

        metrics::commits_truncated(removed);
        log_audit(&AuditEvent::HistoryTruncated {
            line: commit.branch_slug.to_string(),
            from_order: commit.order,
            removed,
        });
        Ok(removed)
    }

    /// Replace the audit sub-record of a branch.
    ///
    /// # Errors
    ///
    /// Returns `BranchNotFound` for an unknown slug.
    #[instrument(skip(self, audit), fields(slug = %slug))]
    pub async fn update_audit_status(
        &self,
        slug: &Slug,
        audit: AuditStatus,
    ) -> Result<Branch, BranchError> {
        let mut conn = self.pool.acquire().await?;
        if !branches::update_audit(&mut conn, slug, &audit).await? {
            return Err(BranchError::BranchNotFound(slug.to_string()));
        }
        branches::find(&mut conn, slug)
            .await?
            .ok_or_else(|| BranchError::BranchNotFound(slug.to_string()))
    }

    /// Apply one signer's decision to the audit sub-record of a branch.
    ///
    /// # Errors
    ///
    /// Returns `BranchNotFound` for an unknown slug, `AuditClosed` when the
    /// workflow is not waiting on signers, or a store `Conflict` if
    /// concurrent votes keep racing this one.
    #[instrument(skip(self), fields(slug = %slug))]
    pub async fn record_audit_vote(&self, slug: &Slug, approve: bool) -> Result<Branch, BranchError> {
        let mut conn = self.pool.acquire().await?;

        for _ in 0..self.max_insert_attempts {
            let branch = branches::find(&mut conn, slug)
                .await?
                .ok_or_else(|| BranchError::BranchNotFound(slug.to_string()))?;

            let mut audit = branch.audit_status.clone();
            audit.record_vote(approve)?;

            if branches::replace_audit(&mut conn, slug, &branch.audit_status, &audit).await? {
                return branches::find(&mut conn, slug)
                    .await?
                    .ok_or_else(|| BranchError::BranchNotFound(slug.to_string()));
            }
        }

        Err(StoreError::Conflict(format!(
            "audit vote on {slug} kept racing concurrent votes"
        ))
        .into())
    }

    /// Explain why a guarded status update matched no row.
    async fn rejected_transition(
        conn: &mut sqlx::SqliteConnection,
        slug: &Slug,
        to: BranchStatus,
    ) -> BranchError {
        match branches::find(conn, slug).await {
            Ok(Some(branch)) => match branch.status.transition_to(to) {
                Err(err) => err,
                Ok(_) => StoreError::Conflict(format!(
                    "status of {slug} changed during the update"
                ))
                .into(),
            },
            Ok(None) => BranchError::BranchNotFound(slug.to_string()),
            Err(e) => e.into(),
        }
    }
}
