/// Audit logging for security events.
pub mod audit;
/// Configuration management for the kernel.
pub mod config;
/// Prometheus counters.
pub mod metrics;
/// HTTP server and control plane.
pub mod server;
/// Telemetry setup for logging, tracing, and metrics.
pub mod telemetry;
