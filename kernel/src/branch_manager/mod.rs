//! Versioning engine for conservation datasets.
//!
//! This module provides the `BranchManager` and the branch/commit domain
//! types. It is separate from the API layer to avoid circular dependencies.

pub mod core;
pub mod types;

pub use core::{BranchManager, DEFAULT_MAX_INSERT_ATTEMPTS};
pub use types::{
    AuditState, AuditStatus, Branch, BranchError, BranchStatus, Commit, CommitDraft,
    CreatedBranch, MergeOutcome, Owner, Slug, TRUNK,
};
