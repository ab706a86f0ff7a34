//! Error types for permsync core
//!
//! Provides error handling for:
//! - Structured control plane failures and their codes
//! - Per-object crawl/apply failures
//! - Migration state invariant violations
//! - Snapshot persistence and configuration

use permsync_acl::{AclError, ObjectKind, ObjectRef};
use std::fmt;

/// Error code reported by the control plane
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ResourceNotFound,
    ResourceDoesNotExist,
    PermissionDenied,
    /// Any other code, kept verbatim
    Other(String),
}

impl ErrorCode {
    /// Parse the wire representation
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code {
            "RESOURCE_NOT_FOUND" => Self::ResourceNotFound,
            "RESOURCE_DOES_NOT_EXIST" => Self::ResourceDoesNotExist,
            "PERMISSION_DENIED" => Self::PermissionDenied,
            other => Self::Other(other.to_string()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::ResourceNotFound => "RESOURCE_NOT_FOUND",
            Self::ResourceDoesNotExist => "RESOURCE_DOES_NOT_EXIST",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::Other(code) => code,
        }
    }

    /// Object vanished or is forbidden: skip it for this run
    #[inline]
    #[must_use]
    pub fn is_soft_skip(&self) -> bool {
        matches!(
            self,
            Self::ResourceNotFound | Self::ResourceDoesNotExist | Self::PermissionDenied
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured error returned by a control plane call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ControlPlaneError {
    pub code: ErrorCode,
    pub message: String,
}

impl ControlPlaneError {
    #[inline]
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::from_code(code),
            message: message.into(),
        }
    }
}

/// Main permsync error type
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Control plane call failed for one object
    #[error("control plane call failed for {object}: {source}")]
    ControlPlane {
        object: ObjectRef,
        #[source]
        source: ControlPlaneError,
    },

    /// Listing objects of one kind failed
    #[error("listing {kind} failed: {source}")]
    Listing {
        kind: ObjectKind,
        #[source]
        source: ControlPlaneError,
    },

    /// Migration state is inconsistent with what the ACL says
    #[error("invariant violation on {object}: {source}")]
    InvariantViolation {
        object: ObjectRef,
        #[source]
        source: AclError,
    },

    /// ACL model error (malformed document, bad plan)
    #[error("acl error: {0}")]
    Acl(#[from] AclError),

    /// Snapshot persistence failed
    #[error("snapshot error: {0}")]
    Snapshot(String),

    /// Snapshot file I/O failed
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Per-object task panicked
    #[error("task for {0} panicked")]
    TaskPanicked(ObjectRef),
}

impl SyncError {
    /// Wrap an ACL error raised while processing `object`
    #[must_use]
    pub fn from_acl(object: &ObjectRef, source: AclError) -> Self {
        if source.is_invariant_violation() {
            Self::InvariantViolation {
                object: object.clone(),
                source,
            }
        } else {
            Self::Acl(source)
        }
    }

    /// Check if a retry could change the outcome
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ControlPlane { source, .. } | Self::Listing { source, .. } => {
                !source.code.is_soft_skip()
            }
            _ => false,
        }
    }

    /// Check if this signals a logic or state bug
    #[inline]
    #[must_use]
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, Self::InvariantViolation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn soft_skip_codes() {
        for code in ["RESOURCE_NOT_FOUND", "RESOURCE_DOES_NOT_EXIST", "PERMISSION_DENIED"] {
            assert!(ErrorCode::from_code(code).is_soft_skip(), "{code}");
        }
        assert!(!ErrorCode::from_code("TEMPORARILY_UNAVAILABLE").is_soft_skip());
        assert_eq!(ErrorCode::from_code("BAD_GATEWAY").as_str(), "BAD_GATEWAY");
    }

    #[test]
    fn sync_error_is_retryable() {
        let object = ObjectRef::new(ObjectKind::Queries, "q1");
        let transient = SyncError::ControlPlane {
            object: object.clone(),
            source: ControlPlaneError::new("TEMPORARILY_UNAVAILABLE", "try later"),
        };
        let denied = SyncError::ControlPlane {
            object: object.clone(),
            source: ControlPlaneError::new("PERMISSION_DENIED", "no"),
        };
        let invariant = SyncError::from_acl(&object, AclError::MissingMigrationInfo("g".into()));

        assert!(transient.is_retryable());
        assert!(!denied.is_retryable());
        assert!(!invariant.is_retryable());
        assert!(invariant.is_invariant_violation());
    }

    #[test]
    fn from_acl_keeps_plain_errors() {
        let object = ObjectRef::new(ObjectKind::Alerts, "a1");
        let err = SyncError::from_acl(&object, AclError::UnknownObjectKind("x".into()));
        assert!(matches!(err, SyncError::Acl(_)));
    }

    #[test]
    fn display_names_object() {
        let err = SyncError::ControlPlane {
            object: ObjectRef::new(ObjectKind::Dashboards, "d9"),
            source: ControlPlaneError::new("INTERNAL_ERROR", "boom"),
        };
        let text = err.to_string();
        assert!(text.contains("dashboards/d9"));
        assert!(text.contains("INTERNAL_ERROR: boom"));
    }
}
