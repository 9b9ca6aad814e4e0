//! Security audit logging for call authorization.
//!
//! Every decision of the [`AuthInterceptor`](super::AuthInterceptor) is
//! logged under the `audit` target with an `event_type` field, so it can be
//! routed separately with `RUST_LOG=audit=info`.

use tracing::{debug, info, warn};

/// Security audit events that should be logged for monitoring and alerting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditEvent {
    /// Token accepted and role allowed
    AuthSuccess {
        method: String,
        username: String,
        role: String,
    },
    /// Missing, malformed or expired token
    AuthFailure { method: String, reason: String },
    /// Valid token, but the role may not call the method
    PermissionDenied {
        method: String,
        username: String,
        role: String,
    },
    /// Method has no access rule
    PublicCall { method: String },
}

/// Log a security audit event with structured fields.
pub fn log_audit_event(event: AuditEvent) {
    match event {
        AuditEvent::AuthSuccess {
            method,
            username,
            role,
        } => {
            info!(
                target: "audit",
                event_type = "auth_success",
                %method,
                %username,
                %role,
                "Call authorized"
            );
        },
        AuditEvent::AuthFailure { method, reason } => {
            warn!(
                target: "audit",
                event_type = "auth_failure",
                %method,
                %reason,
                "Authentication failed"
            );
        },
        AuditEvent::PermissionDenied {
            method,
            username,
            role,
        } => {
            warn!(
                target: "audit",
                event_type = "permission_denied",
                %method,
                %username,
                %role,
                "Role may not call method"
            );
        },
        AuditEvent::PublicCall { method } => {
            debug!(
                target: "audit",
                event_type = "public_call",
                %method,
                "Public call, no token required"
            );
        },
    }
}
