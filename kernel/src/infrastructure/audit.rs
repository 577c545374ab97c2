use serde::Serialize;
use tracing::{info, info_span};

/// Domain event for audit logging.
/// Structured for JSON serialization to enable machine-readable audit trails.
#[derive(Debug, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AuditEvent {
    /// Process started.
    SystemStartup {
        /// Component that started.
        component: String,
    },
    /// Process is shutting down.
    SystemShutdown {
        /// Why it stopped.
        reason: String,
    },
    /// A caller failed the access gate.
    AccessDenied {
        /// Caller id, if the credential carried one.
        user: String,
        /// Requested path.
        resource: String,
    },
    /// A branch and its initial commit were written.
    BranchCreated {
        /// Branch slug.
        slug: String,
        /// Owner id.
        owner: String,
        /// Conservation the branch edits.
        conservation: String,
    },
    /// A branch tip landed on the trunk.
    BranchMerged {
        /// Branch slug.
        slug: String,
        /// Trunk commit slug.
        commit: String,
        /// Trunk commit order.
        order: i64,
    },
    /// A branch was soft-deleted.
    BranchDeleted {
        /// Branch slug.
        slug: String,
    },
    /// Commits were discarded from a line.
    HistoryTruncated {
        /// Line slug.
        line: String,
        /// First discarded order.
        from_order: i64,
        /// Number of commits removed.
        removed: u64,
    },
}

/// Logs an audit event to the dedicated audit channel as structured JSON.
/// This uses a specific `target` which can be filtered by the subscriber to redirect to a secure file.
pub fn log_audit(event: &AuditEvent) {
    let span = info_span!(target: "audit", "audit_event");
    let _enter = span.enter();

    let json = serde_json::to_string(event).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"));
    info!(target: "audit", audit_json = %json, "Security Audit Event");
}
