//! Request and response types for the branch API.

use serde::{Deserialize, Serialize};

use crate::branch_manager::CommitDraft;

/// Request to create a new branch.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBranchRequest {
    /// Branch description.
    #[serde(default)]
    pub branch_note: Option<String>,
    /// Message of the initial commit.
    #[serde(default)]
    pub commit_note: Option<String>,
    /// Payload of the initial commit.
    #[serde(default)]
    pub features: Option<serde_json::Value>,
    /// Dataset to edit; the configured default when absent.
    #[serde(default)]
    pub conservation_slug: Option<String>,
}

impl CreateBranchRequest {
    /// The initial commit described by this request.
    #[must_use]
    pub fn initial_commit(&self) -> CommitDraft {
        CommitDraft::new(self.commit_note.clone(), self.features.clone())
    }
}

/// Request to append a commit to a branch line.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRequest {
    /// Target line.
    pub branch_slug: String,
    /// Commit message.
    #[serde(default)]
    pub commit_note: Option<String>,
    /// Commit payload.
    #[serde(default)]
    pub features: Option<serde_json::Value>,
}

impl CommitRequest {
    /// The commit described by this request.
    #[must_use]
    pub fn draft(&self) -> CommitDraft {
        CommitDraft::new(self.commit_note.clone(), self.features.clone())
    }
}

/// Response for a history truncation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteCommitResponse {
    /// Number of commits discarded.
    pub removed: u64,
}
