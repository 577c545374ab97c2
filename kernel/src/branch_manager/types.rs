//! Branch and commit types for the versioning kernel.
//!
//! This module provides the domain model shared by the stores, the
//! versioning engine and the HTTP layer.

use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::store::StoreError;

/// Branch line identifier of the implicit trunk.
///
/// The trunk has no branch record; it only exists as a `branch_slug` value
/// in the commit store.
pub const TRUNK: &str = "main";

/// Number of random bytes behind a generated slug.
const SLUG_BYTES: usize = 8;

/// Longest slug accepted from callers.
const MAX_SLUG_LEN: usize = 64;

/// Opaque external identifier for branches and commits.
///
/// Generated slugs are 8 random bytes rendered as 16 hex characters. Slugs
/// received from callers are only checked for shape, never interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slug(String);

impl Slug {
    /// Create a slug from caller input.
    ///
    /// # Errors
    ///
    /// Returns an error if the slug is empty, too long or contains characters
    /// other than ASCII alphanumerics, `-` and `_`.
    pub fn new(slug: impl Into<String>) -> Result<Self, BranchError> {
        let slug = slug.into();
        if slug.is_empty() {
            return Err(BranchError::Validation("slug cannot be empty".to_string()));
        }
        if slug.len() > MAX_SLUG_LEN {
            return Err(BranchError::Validation(format!(
                "slug too long: {} characters",
                slug.len()
            )));
        }
        if let Some(c) = slug
            .chars()
            .find(|c| !c.is_ascii_alphanumeric() && *c != '-' && *c != '_')
        {
            return Err(BranchError::Validation(format!(
                "invalid character '{c}' in slug"
            )));
        }
        Ok(Self(slug))
    }

    /// Generate a fresh random slug.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; SLUG_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// The trunk line identifier.
    #[must_use]
    pub fn trunk() -> Self {
        Self(TRUNK.to_string())
    }

    /// Whether this slug names the trunk line.
    #[must_use]
    pub fn is_trunk(&self) -> bool {
        self.0 == TRUNK
    }

    /// Get the string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub(crate) fn from_trusted(slug: String) -> Self {
        Self(slug)
    }
}

impl std::fmt::Display for Slug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Branch-related errors.
#[derive(Debug, thiserror::Error)]
pub enum BranchError {
    /// Branch not found.
    #[error("Branch not found: {0}")]
    BranchNotFound(String),
    /// Commit not found.
    #[error("Commit not found: {0}")]
    CommitNotFound(String),
    /// Invalid state transition.
    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition {
        /// Current state name.
        from: BranchStatus,
        /// Target state name.
        to: BranchStatus,
    },
    /// Caller supplied data the engine refuses.
    #[error("Validation error: {0}")]
    Validation(String),
    /// The approval workflow is not waiting on any signer.
    #[error("Audit workflow is not accepting votes (state {0:?})")]
    AuditClosed(AuditState),
    /// Persistence failure.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl From<sqlx::Error> for BranchError {
    fn from(e: sqlx::Error) -> Self {
        Self::Store(StoreError::Database(e))
    }
}

/// Branch lifecycle status.
///
/// Serialized as the integer codes `0`, `1` and `2`. Only
/// `Active -> Merged` and `Active -> Deleted` are legal transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub enum BranchStatus {
    /// Accepting commits.
    #[default]
    Active,
    /// Tip copied onto the trunk.
    Merged,
    /// Soft-deleted.
    Deleted,
}

impl BranchStatus {
    /// Integer code stored in the database and sent over the wire.
    #[must_use]
    pub fn code(self) -> i64 {
        match self {
            BranchStatus::Active => 0,
            BranchStatus::Merged => 1,
            BranchStatus::Deleted => 2,
        }
    }

    /// Check that `self -> to` is a legal transition.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` for any transition out of a terminal
    /// status or back to `Active`.
    pub fn transition_to(self, to: BranchStatus) -> Result<BranchStatus, BranchError> {
        match (self, to) {
            (BranchStatus::Active, BranchStatus::Merged | BranchStatus::Deleted) => Ok(to),
            (from, to) => Err(BranchError::InvalidStateTransition { from, to }),
        }
    }
}

impl From<BranchStatus> for i64 {
    fn from(status: BranchStatus) -> Self {
        status.code()
    }
}

impl TryFrom<i64> for BranchStatus {
    type Error = String;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(BranchStatus::Active),
            1 => Ok(BranchStatus::Merged),
            2 => Ok(BranchStatus::Deleted),
            other => Err(format!("unknown branch status code {other}")),
        }
    }
}

impl std::fmt::Display for BranchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BranchStatus::Active => write!(f, "active"),
            BranchStatus::Merged => write!(f, "merged"),
            BranchStatus::Deleted => write!(f, "deleted"),
        }
    }
}

/// State of the external approval workflow attached to a branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub enum AuditState {
    /// No envelope sent yet.
    #[default]
    None,
    /// Envelope sent, waiting on signers.
    Sent,
    /// Every signer approved.
    Approved,
    /// At least one signer denied.
    Denied,
}

impl From<AuditState> for i64 {
    fn from(state: AuditState) -> Self {
        match state {
            AuditState::None => 0,
            AuditState::Sent => 1,
            AuditState::Approved => 2,
            AuditState::Denied => 3,
        }
    }
}

impl TryFrom<i64> for AuditState {
    type Error = String;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(AuditState::None),
            1 => Ok(AuditState::Sent),
            2 => Ok(AuditState::Approved),
            3 => Ok(AuditState::Denied),
            other => Err(format!("unknown audit state code {other}")),
        }
    }
}

/// Approval workflow sub-record of a branch.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditStatus {
    /// Workflow state.
    pub status: AuditState,
    /// Signers that approved.
    pub approvals: i64,
    /// Signers that denied.
    pub denials: i64,
    /// Signers yet to act.
    pub pending: i64,
    /// Envelope identifier at the e-signature provider.
    pub envelope_id: String,
}

impl AuditStatus {
    /// Apply one signer's decision.
    ///
    /// Any denial moves the workflow to `Denied`; the last outstanding
    /// approval moves it to `Approved`.
    ///
    /// # Errors
    ///
    /// Returns `AuditClosed` unless the workflow is `Sent` with signers
    /// still pending; the record is left untouched.
    pub fn record_vote(&mut self, approve: bool) -> Result<(), BranchError> {
        if self.status != AuditState::Sent || self.pending <= 0 {
            return Err(BranchError::AuditClosed(self.status));
        }

        self.pending -= 1;
        if approve {
            self.approvals += 1;
        } else {
            self.denials += 1;
        }

        self.status = if self.denials > 0 {
            AuditState::Denied
        } else if self.pending == 0 {
            AuditState::Approved
        } else {
            AuditState::Sent
        };
        Ok(())
    }
}

/// Snapshot of the creator's identity, copied at branch creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Owner {
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Contact email.
    pub email: String,
    /// User id at creation time.
    pub id: String,
}

/// Branch domain model.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    /// Branch slug.
    pub slug: Slug,
    /// Dataset the branch edits.
    pub conservation_slug: String,
    /// Creator snapshot.
    pub owner: Owner,
    /// Free-text description.
    pub note: String,
    /// Lifecycle status.
    pub status: BranchStatus,
    /// Approval workflow sub-state.
    pub audit_status: AuditStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last status or audit change.
    pub updated_at: DateTime<Utc>,
}

/// Commit domain model.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    /// Commit slug.
    pub slug: Slug,
    /// Line the commit belongs to (a branch slug or [`TRUNK`]).
    pub branch_slug: Slug,
    /// Commit message.
    pub note: Option<String>,
    /// Dataset-specific edit payload, opaque to the engine.
    pub features: Option<serde_json::Value>,
    /// Position within the line.
    pub order: i64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Equal to `created_at`; commits are immutable.
    pub updated_at: DateTime<Utc>,
}

/// Note and payload of a commit about to be appended.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommitDraft {
    /// Commit message.
    pub note: Option<String>,
    /// Edit payload.
    pub features: Option<serde_json::Value>,
}

impl CommitDraft {
    /// Draft carrying a note and payload.
    #[must_use]
    pub fn new(note: Option<String>, features: Option<serde_json::Value>) -> Self {
        Self { note, features }
    }
}

impl From<&Commit> for CommitDraft {
    fn from(commit: &Commit) -> Self {
        Self {
            note: commit.note.clone(),
            features: commit.features.clone(),
        }
    }
}

/// Result of a successful merge.
#[derive(Debug, Clone, Serialize)]
pub struct MergeOutcome {
    /// The branch, now `Merged`.
    pub branch: Branch,
    /// The commit appended to the trunk.
    pub commit: Commit,
}

/// Result of a successful branch creation.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedBranch {
    /// The new branch.
    pub branch: Branch,
    /// Its order-0 commit.
    pub commit: Commit,
}
