//! Column constants shared by the store queries.

/// Column constants for the commits table
pub mod commit_cols {
    /// Commit slug column name
    pub const SLUG: &str = "slug";
    /// Commit `branch_slug` column name
    pub const BRANCH_SLUG: &str = "branch_slug";
    /// Commit note column name
    pub const NOTE: &str = "note";
    /// Commit features column name (JSON text)
    pub const FEATURES: &str = "features";
    /// Commit `commit_order` column name
    pub const ORDER: &str = "commit_order";
    /// Commit `created_at` column name
    pub const CREATED_AT: &str = "created_at";
    /// Commit `updated_at` column name
    pub const UPDATED_AT: &str = "updated_at";
}

/// Column constants for the branches table
pub mod branch_cols {
    /// Branch slug column name
    pub const SLUG: &str = "slug";
    /// Branch `conservation_slug` column name
    pub const CONSERVATION_SLUG: &str = "conservation_slug";
    /// Branch `owner_id` column name
    pub const OWNER_ID: &str = "owner_id";
    /// Branch `owner_first_name` column name
    pub const OWNER_FIRST_NAME: &str = "owner_first_name";
    /// Branch `owner_last_name` column name
    pub const OWNER_LAST_NAME: &str = "owner_last_name";
    /// Branch `owner_email` column name
    pub const OWNER_EMAIL: &str = "owner_email";
    /// Branch note column name
    pub const NOTE: &str = "note";
    /// Branch status column name
    pub const STATUS: &str = "status";
    /// Branch `audit_status` column name
    pub const AUDIT_STATUS: &str = "audit_status";
    /// Branch `audit_approvals` column name
    pub const AUDIT_APPROVALS: &str = "audit_approvals";
    /// Branch `audit_denials` column name
    pub const AUDIT_DENIALS: &str = "audit_denials";
    /// Branch `audit_pending` column name
    pub const AUDIT_PENDING: &str = "audit_pending";
    /// Branch `audit_envelope_id` column name
    pub const AUDIT_ENVELOPE_ID: &str = "audit_envelope_id";
    /// Branch `created_at` column name
    pub const CREATED_AT: &str = "created_at";
    /// Branch `updated_at` column name
    pub const UPDATED_AT: &str = "updated_at";
}

/// SQL SELECT column list for commits
pub const COMMIT_COLUMNS: &str =
    "slug, branch_slug, note, features, commit_order, created_at, updated_at";

/// SQL SELECT column list for branches
pub const BRANCH_COLUMNS: &str = "slug, conservation_slug, owner_id, owner_first_name, \
     owner_last_name, owner_email, note, status, audit_status, audit_approvals, audit_denials, \
     audit_pending, audit_envelope_id, created_at, updated_at";
