//! Shared state handed to every request handler.

pub mod state;

pub use state::KernelState;
