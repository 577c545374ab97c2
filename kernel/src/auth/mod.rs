//! Access gate: resolves a caller identity from a credential.
//!
//! The versioning engine never sees credentials. Protected routes run the
//! gate through the [`Caller`] extractor and hand the engine an [`Owner`]
//! snapshot of the resolved user.
//!
//! [`Owner`]: crate::branch_manager::Owner

pub mod extract;
pub mod gate;
pub mod jwt;

pub use extract::{ACCESS_TOKEN_HEADER, Caller};
pub use gate::{AccessGate, AuthError};
pub use jwt::{Claims, JwtAccessGate, issue_token};
