//! HS256 JWT access gate.
//!
//! Tokens carry the caller id in a `uid` claim. `exp` is honoured when
//! present but not required.

use std::collections::HashSet;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{debug, instrument};

use super::gate::{AccessGate, AuthError};
use crate::store::users::{self, User};
use crate::store::StoreError;

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Caller id.
    pub uid: String,
    /// Expiration timestamp (seconds since the epoch).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
    /// Issued at timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,
}

/// Access gate verifying HS256 tokens against a shared secret and resolving
/// the `uid` claim in the user store.
pub struct JwtAccessGate {
    pool: SqlitePool,
    key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for JwtAccessGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtAccessGate").finish_non_exhaustive()
    }
}

impl JwtAccessGate {
    /// Create a gate for tokens signed with `secret`.
    #[must_use]
    pub fn new(pool: SqlitePool, secret: &SecretString) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims = HashSet::new();

        Self {
            pool,
            key: DecodingKey::from_secret(secret.expose_secret().as_bytes()),
            validation,
        }
    }

    /// Verify the signature and decode the claims.
    ///
    /// # Errors
    ///
    /// Returns `InvalidToken` for a malformed, forged or expired token.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }
}

#[async_trait]
impl AccessGate for JwtAccessGate {
    #[instrument(skip(self, credential))]
    async fn authenticate(&self, credential: &str) -> Result<User, AuthError> {
        let claims = self.verify(credential)?;

        let mut conn = self.pool.acquire().await.map_err(StoreError::from)?;
        let user = users::find(&mut conn, &claims.uid)
            .await?
            .ok_or(AuthError::UnknownUser(claims.uid))?;

        debug!(uid = %user.id, "Caller authenticated");
        Ok(user)
    }
}

/// Sign an access token for `uid`, valid for `ttl_secs` seconds.
///
/// # Errors
///
/// Returns an error if the claims cannot be encoded.
pub fn issue_token(
    secret: &SecretString,
    uid: &str,
    ttl_secs: u64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs());

    let claims = Claims {
        uid: uid.to_string(),
        exp: Some(now + ttl_secs),
        iat: Some(now),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.expose_secret().as_bytes()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{connect, migrate};
    use anyhow::Result;

    fn secret(s: &str) -> SecretString {
        SecretString::from(s.to_string())
    }

    async fn gate_with_user() -> Result<JwtAccessGate> {
        let pool = connect("sqlite::memory:", 1).await?;
        migrate(&pool, "schweinfurthii").await?;
        let mut conn = pool.acquire().await?;
        users::upsert(
            &mut conn,
            &User {
                id: "u-1".to_string(),
                first_name: "Jane".to_string(),
                last_name: "Goodall".to_string(),
                email: "jane@example.org".to_string(),
            },
        )
        .await?;
        drop(conn);
        Ok(JwtAccessGate::new(pool, &secret("test-secret")))
    }

    #[tokio::test]
    async fn test_valid_token_resolves_user() -> Result<()> {
        let gate = gate_with_user().await?;
        let token = issue_token(&secret("test-secret"), "u-1", 60)?;

        let user = gate.authenticate(&token).await?;
        assert_eq!(user.id, "u-1");
        assert_eq!(user.first_name, "Jane");
        Ok(())
    }

    #[tokio::test]
    async fn test_token_without_exp_is_accepted() -> Result<()> {
        let gate = gate_with_user().await?;
        let claims = Claims {
            uid: "u-1".to_string(),
            exp: None,
            iat: None,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )?;

        assert!(gate.authenticate(&token).await.is_ok());
        Ok(())
    }

    #[tokio::test]
    async fn test_wrong_secret_is_invalid() -> Result<()> {
        let gate = gate_with_user().await?;
        let token = issue_token(&secret("other-secret"), "u-1", 60)?;

        assert!(matches!(
            gate.authenticate(&token).await,
            Err(AuthError::InvalidToken(_))
        ));
        assert!(matches!(
            gate.authenticate("not.a.jwt").await,
            Err(AuthError::InvalidToken(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_user() -> Result<()> {
        let gate = gate_with_user().await?;
        let token = issue_token(&secret("test-secret"), "ghost", 60)?;

        let err = gate.authenticate(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::UnknownUser(ref uid) if uid == "ghost"));
        assert_eq!(err.to_string(), "User does not exist within database.");
        Ok(())
    }
}
