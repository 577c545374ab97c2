//! REST API for the conservation kernel.
//!
//! This module provides the HTTP endpoints of the versioning engine.

pub mod branches;
pub mod json;

pub use branches::ApiError;
pub use branches::routes as branch_routes;
pub use json::ValidatedJson;
