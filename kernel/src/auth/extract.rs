//! Axum extractor that runs the access gate.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use super::gate::AuthError;
use crate::api::ApiError;
use crate::branch_manager::Owner;
use crate::host::KernelState;
use crate::infrastructure::audit::{AuditEvent, log_audit};
use crate::infrastructure::metrics;
use crate::store::users::User;

/// Header carrying the access token.
pub const ACCESS_TOKEN_HEADER: &str = "x-access-token";

/// Authenticated caller of a protected route.
#[derive(Debug, Clone)]
pub struct Caller(pub User);

impl Caller {
    /// Snapshot of the caller for embedding into a branch.
    #[must_use]
    pub fn owner(&self) -> Owner {
        self.0.to_owner()
    }
}

/// Credential from `x-access-token`, falling back to `Authorization: Bearer`.
fn credential(parts: &Parts) -> Option<&str> {
    if let Some(token) = parts
        .headers
        .get(ACCESS_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|t| !t.is_empty())
    {
        return Some(token);
    }

    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

impl FromRequestParts<Arc<KernelState>> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<KernelState>,
    ) -> Result<Self, Self::Rejection> {
        let result = match credential(parts) {
            Some(token) => state.gate().authenticate(token).await,
            None => Err(AuthError::MissingToken),
        };

        result.map(Caller).map_err(|err| {
            let user = match &err {
                AuthError::UnknownUser(uid) => uid.clone(),
                _ => "anonymous".to_string(),
            };
            metrics::access_denied(err.reason());
            log_audit(&AuditEvent::AccessDenied {
                user,
                resource: parts.uri.path().to_string(),
            });
            ApiError::Auth(err)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().uri("/api/branch/merge/abc");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).expect("valid request").into_parts().0
    }

    #[test]
    fn test_credential_sources() {
        assert_eq!(credential(&parts(&[("x-access-token", "abc")])), Some("abc"));
        assert_eq!(
            credential(&parts(&[("authorization", "Bearer xyz")])),
            Some("xyz")
        );
        assert_eq!(
            credential(&parts(&[
                ("x-access-token", "first"),
                ("authorization", "Bearer second")
            ])),
            Some("first")
        );
        assert_eq!(credential(&parts(&[("authorization", "Basic Zm9v")])), None);
        assert_eq!(credential(&parts(&[("x-access-token", "  ")])), None);
        assert_eq!(credential(&parts(&[])), None);
    }
}
