//! Conservation Kernel - branch/commit versioning for conservation datasets.
//!
//! This crate provides the SQLite-backed commit store and branch registry,
//! the versioning engine that creates, truncates and merges branch lines,
//! a JWT access gate and the axum HTTP surface in front of them.

#![warn(missing_docs)]
#![warn(clippy::pedantic)]

/// REST API handlers and routes.
pub mod api;
/// Caller authentication.
pub mod auth;
/// Versioning engine and domain types.
pub mod branch_manager;
/// Shared request state.
pub mod host;
/// Infrastructure components (config, server, telemetry).
pub mod infrastructure;
/// SQLite persistence.
pub mod store;
