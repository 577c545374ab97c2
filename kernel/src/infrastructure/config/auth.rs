//! Access token settings.

use secrecy::SecretString;
use serde::Deserialize;

/// Settings for verifying caller access tokens.
#[derive(Debug, Deserialize, Clone)]
pub struct AuthSettings {
    /// HS256 signing secret shared with the token issuer.
    pub jwt_secret: SecretString,
}
