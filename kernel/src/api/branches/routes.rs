//! REST API routes for branch management.
//!
//! Paths are relative; the server nests them under the configured base path.

use axum::{
    Router,
    routing::{delete, get, post},
};
use std::sync::Arc;

use crate::api::branches::handlers::{
    create_branch, create_commit, delete_branch, delete_commit, get_branch, list_branches,
    list_commits, list_conservations, merge_branch,
};
use crate::host::KernelState;

/// API routes for branch management.
pub fn routes() -> Router<Arc<KernelState>> {
    Router::new()
        .route("/conservations", get(list_conservations))
        .route("/all", get(list_branches))
        .route("/create", post(create_branch))
        .route("/commit", post(create_commit))
        .route("/commit/{id}", delete(delete_commit))
        .route("/merge/{id}", get(merge_branch).post(merge_branch))
        .route("/{id}/commits", get(list_commits))
        .route("/{id}", get(get_branch).delete(delete_branch))
}
