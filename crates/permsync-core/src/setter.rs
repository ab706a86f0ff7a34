//! Permission setter
//!
//! Writes a complete ACL through the set limiter. The control plane only
//! offers full replacement, so callers pass every entry that must survive,
//! not just the changed ones.

use crate::control_plane::ControlPlane;
use crate::error::SyncError;
use crate::rate_limit::RateLimiter;
use permsync_acl::{AclDocument, AclEntry, ObjectKind, ObjectRef};
use std::sync::Arc;

/// Rate-limited writer of remote ACLs
#[derive(Clone)]
pub struct PermissionSetter {
    control_plane: Arc<dyn ControlPlane>,
    limiter: Arc<RateLimiter>,
}

impl PermissionSetter {
    #[must_use]
    pub fn new(control_plane: Arc<dyn ControlPlane>, limiter: Arc<RateLimiter>) -> Self {
        Self {
            control_plane,
            limiter,
        }
    }

    /// Replace the ACL of one object with `acl`
    ///
    /// Applying the same list twice leaves the same remote state.
    ///
    /// # Returns
    /// The document the control plane reports after the write.
    ///
    /// # Errors
    /// Returns [`SyncError::ControlPlane`] on any control plane failure.
    pub async fn set(
        &self,
        object_kind: ObjectKind,
        object_id: &str,
        acl: &[AclEntry],
    ) -> Result<AclDocument, SyncError> {
        tracing::debug!(%object_kind, object_id, entries = acl.len(), "setting permissions");
        self.limiter
            .run(|| self.control_plane.set_permissions(object_kind, object_id, acl))
            .await
            .map_err(|source| SyncError::ControlPlane {
                object: ObjectRef::new(object_kind, object_id),
                source,
            })
    }
}

impl std::fmt::Debug for PermissionSetter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionSetter")
            .field("limiter", &self.limiter.name())
            .finish_non_exhaustive()
    }
}
