//! Access gate abstraction.

use async_trait::async_trait;

use crate::store::StoreError;
use crate::store::users::User;

/// Reasons a caller is turned away.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No credential on the request.
    #[error("Missing token")]
    MissingToken,
    /// Credential failed verification.
    #[error("Invalid token: {0}")]
    InvalidToken(String),
    /// Credential is valid but names no known user.
    #[error("User does not exist within database.")]
    UnknownUser(String),
    /// Identity lookup failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl AuthError {
    /// Short label used for metrics.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "missing_token",
            AuthError::InvalidToken(_) => "invalid_token",
            AuthError::UnknownUser(_) => "unknown_user",
            AuthError::Store(_) => "store",
        }
    }
}

/// Resolves a credential into the identity of a registered user.
#[async_trait]
pub trait AccessGate: Send + Sync {
    /// Verify `credential` and return the user it identifies.
    ///
    /// # Errors
    ///
    /// Returns `InvalidToken` if the credential does not verify and
    /// `UnknownUser` if it names nobody in the user store.
    async fn authenticate(&self, credential: &str) -> Result<User, AuthError>;
}
