//! API Handler implementations for branch management.
//!
//! This module provides HTTP request handlers for branch and commit
//! operations.

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::sync::Arc;
use tracing::error;

use crate::api::branches::types::{CommitRequest, CreateBranchRequest, DeleteCommitResponse};
use crate::api::json::ValidatedJson;
use crate::auth::{AuthError, Caller};
use crate::branch_manager::{Branch, BranchError, Commit, CreatedBranch, MergeOutcome, Slug};
use crate::host::KernelState;
use crate::store::StoreError;
use crate::store::conservations::Conservation;

/// API errors for branch operations.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Domain-level branch error.
    #[error("Branch error: {0}")]
    Branch(#[from] BranchError),
    /// Caller rejected by the access gate.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),
    /// Malformed request body.
    #[error("Validation error: {0}")]
    Validation(String),
}

impl ApiError {
    /// Status code and client-facing message.
    #[must_use]
    pub fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            ApiError::Branch(BranchError::BranchNotFound(slug)) => {
                (StatusCode::BAD_REQUEST, format!("Branch not found: {slug}"))
            }
            ApiError::Branch(BranchError::CommitNotFound(slug)) => {
                (StatusCode::BAD_REQUEST, format!("Commit not found: {slug}"))
            }
            ApiError::Branch(BranchError::InvalidStateTransition { from, to }) => (
                StatusCode::CONFLICT,
                format!("Invalid state transition from {from} to {to}"),
            ),
            ApiError::Branch(BranchError::Validation(msg)) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Branch(err @ BranchError::AuditClosed(_)) => {
                (StatusCode::CONFLICT, err.to_string())
            }
            ApiError::Branch(BranchError::Store(StoreError::Conflict(msg))) => {
                (StatusCode::CONFLICT, msg.clone())
            }
            ApiError::Auth(AuthError::MissingToken) => {
                (StatusCode::BAD_REQUEST, "Missing token".to_string())
            }
            ApiError::Auth(AuthError::InvalidToken(_)) => {
                (StatusCode::FORBIDDEN, "Invalid token".to_string())
            }
            ApiError::Auth(err @ AuthError::UnknownUser(_)) => {
                (StatusCode::NOT_ACCEPTABLE, err.to_string())
            }
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "Validation Error".to_string()),
            ApiError::Branch(BranchError::Store(_)) | ApiError::Auth(AuthError::Store(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }

        let body = Json(json!({
            "status": status.as_u16(),
            "message": message,
        }));

        (status, body).into_response()
    }
}

/// GET /conservations
///
/// List every conservation dataset.
pub async fn list_conservations(
    State(state): State<Arc<KernelState>>,
) -> Result<Json<Vec<Conservation>>, ApiError> {
    Ok(Json(state.branches().conservations().await?))
}

/// GET /all
///
/// List every branch regardless of status.
pub async fn list_branches(
    State(state): State<Arc<KernelState>>,
) -> Result<Json<Vec<Branch>>, ApiError> {
    Ok(Json(state.branches().list().await?))
}

/// POST /create
///
/// Create a branch and its initial commit.
pub async fn create_branch(
    State(state): State<Arc<KernelState>>,
    caller: Caller,
    ValidatedJson(req): ValidatedJson<CreateBranchRequest>,
) -> Result<Json<CreatedBranch>, ApiError> {
    let created = state
        .branches()
        .create(
            &caller.owner(),
            req.conservation_slug.as_deref(),
            req.branch_note.as_deref().unwrap_or_default(),
            req.initial_commit(),
        )
        .await?;

    Ok(Json(created))
}

/// POST /commit
///
/// Append a commit to a branch line.
pub async fn create_commit(
    State(state): State<Arc<KernelState>>,
    _caller: Caller,
    ValidatedJson(req): ValidatedJson<CommitRequest>,
) -> Result<Json<Commit>, ApiError> {
    let line = Slug::new(req.branch_slug.as_str())?;
    let commit = state.branches().commit(&line, req.draft()).await?;
    Ok(Json(commit))
}

/// GET /{id}/commits
///
/// History of a branch line, newest first. Unknown lines answer `[]`.
pub async fn list_commits(
    State(state): State<Arc<KernelState>>,
    _caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<Vec<Commit>>, ApiError> {
    let Ok(line) = Slug::new(id) else {
        return Ok(Json(Vec::new()));
    };
    Ok(Json(state.branches().history(&line).await?))
}

/// GET /{id}
///
/// Look up a branch. Unknown slugs answer `null`.
pub async fn get_branch(
    State(state): State<Arc<KernelState>>,
    Path(id): Path<String>,
) -> Result<Json<Option<Branch>>, ApiError> {
    let Ok(slug) = Slug::new(id) else {
        return Ok(Json(None));
    };
    Ok(Json(state.branches().find(&slug).await?))
}

/// DELETE /{id}
///
/// Soft-delete an active branch.
pub async fn delete_branch(
    State(state): State<Arc<KernelState>>,
    _caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<Branch>, ApiError> {
    let slug = Slug::new(id)?;
    Ok(Json(state.branches().delete(&slug).await?))
}

/// DELETE /commit/{id}
///
/// Discard a commit and everything after it on its branch line.
pub async fn delete_commit(
    State(state): State<Arc<KernelState>>,
    _caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<DeleteCommitResponse>, ApiError> {
    let slug = Slug::new(id)?;
    let removed = state.branches().delete_commit(&slug).await?;
    Ok(Json(DeleteCommitResponse { removed }))
}

/// GET /merge/{id}
///
/// Merge a branch onto the trunk. Also served as `POST`.
pub async fn merge_branch(
    State(state): State<Arc<KernelState>>,
    _caller: Caller,
    Path(id): Path<String>,
) -> Result<Json<MergeOutcome>, ApiError> {
    let slug = Slug::new(id)?;
    Ok(Json(state.branches().merge(&slug).await?))
}

/// Fallback for unmatched routes.
pub async fn unknown_endpoint() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "unknown endpoint" })),
    )
}
