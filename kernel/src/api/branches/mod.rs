//! REST API endpoints for branch management.
//!
//! This module provides HTTP endpoints for creating branches, appending and
//! truncating commits, and merging branches onto the trunk.

pub mod handlers;
pub mod routes;
pub mod types;

pub use handlers::{ApiError, unknown_endpoint};
pub use routes::routes;
pub use types::{CommitRequest, CreateBranchRequest, DeleteCommitResponse};
