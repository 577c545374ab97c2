//! Counters exported through the Prometheus recorder.
//!
//! Without an installed recorder every call is a no-op.

use metrics::{counter, describe_counter};

/// Branches created.
pub const BRANCHES_CREATED: &str = "branches_created_total";
/// Commits appended through the commit operation.
pub const COMMITS_APPENDED: &str = "commits_appended_total";
/// Branches merged onto the trunk.
pub const BRANCHES_MERGED: &str = "branches_merged_total";
/// Branches soft-deleted.
pub const BRANCHES_DELETED: &str = "branches_deleted_total";
/// Commits removed by history truncation.
pub const COMMITS_TRUNCATED: &str = "commits_truncated_total";
/// Requests rejected by the access gate.
pub const ACCESS_DENIED: &str = "access_denied_total";

/// Register counter descriptions with the installed recorder.
pub fn describe() {
    describe_counter!(BRANCHES_CREATED, "Branches created");
    describe_counter!(COMMITS_APPENDED, "Commits appended to a branch line");
    describe_counter!(BRANCHES_MERGED, "Branches merged onto the trunk");
    describe_counter!(BRANCHES_DELETED, "Branches soft-deleted");
    describe_counter!(COMMITS_TRUNCATED, "Commits removed by history truncation");
    describe_counter!(ACCESS_DENIED, "Requests rejected by the access gate");
}

pub(crate) fn branch_created() {
    counter!(BRANCHES_CREATED).increment(1);
}

pub(crate) fn commit_appended() {
    counter!(COMMITS_APPENDED).increment(1);
}

pub(crate) fn branch_merged() {
    counter!(BRANCHES_MERGED).increment(1);
}

pub(crate) fn branch_deleted() {
    counter!(BRANCHES_DELETED).increment(1);
}

pub(crate) fn commits_truncated(removed: u64) {
    counter!(COMMITS_TRUNCATED).increment(removed);
}

pub(crate) fn access_denied(reason: &'static str) {
    counter!(ACCESS_DENIED, "reason" => reason).increment(1);
}
