//! Permission fetcher
//!
//! Reads one object's ACL through the fetch limiter. Objects that vanished
//! or are forbidden are skipped for this run rather than failing it.

use crate::control_plane::ControlPlane;
use crate::error::SyncError;
use crate::rate_limit::RateLimiter;
use permsync_acl::{ObjectKind, ObjectRef, PermissionRecord};
use std::sync::Arc;

/// Rate-limited reader of remote ACLs
#[derive(Clone)]
pub struct PermissionFetcher {
    control_plane: Arc<dyn ControlPlane>,
    limiter: Arc<RateLimiter>,
}

impl PermissionFetcher {
    #[must_use]
    pub fn new(control_plane: Arc<dyn ControlPlane>, limiter: Arc<RateLimiter>) -> Self {
        Self {
            control_plane,
            limiter,
        }
    }

    /// Fetch the current ACL of one object
    ///
    /// # Returns
    /// `None` when the control plane reports the object as not found, no
    /// longer existing, or forbidden.
    ///
    /// # Errors
    /// Any other control plane failure, as a retryable [`SyncError::ControlPlane`].
    pub async fn fetch(
        &self,
        object_kind: ObjectKind,
        object_id: &str,
    ) -> Result<Option<PermissionRecord>, SyncError> {
        let object = ObjectRef::new(object_kind, object_id);
        let fetched = self
            .limiter
            .run(|| self.control_plane.get_permissions(object_kind, object_id))
            .await;

        match fetched {
            Ok(document) => Ok(Some(PermissionRecord::from_document(&object, &document)?)),
            Err(error) if error.code.is_soft_skip() => {
                tracing::warn!(
                    object_kind = %object_kind,
                    object_id,
                    code = %error.code,
                    "could not get permissions, skipping"
                );
                Ok(None)
            }
            Err(source) => Err(SyncError::ControlPlane { object, source }),
        }
    }
}

impl std::fmt::Debug for PermissionFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionFetcher")
            .field("limiter", &self.limiter.name())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RateLimitConfig;
    use crate::error::ControlPlaneError;
    use crate::testing::MockPlane;
    use permsync_acl::{AclDocument, AclEntry, PermissionLevel};

    fn fetcher(plane: MockPlane) -> PermissionFetcher {
        PermissionFetcher::new(
            Arc::new(plane),
            Arc::new(RateLimiter::new("fetch", RateLimitConfig::per_second(100))),
        )
    }

    #[tokio::test]
    async fn returns_record_with_raw_document() {
        let mut plane = MockPlane::new();
        plane.expect_get_permissions().times(1).returning(|kind, id| {
            Ok(AclDocument::new(
                &ObjectRef::new(kind, id),
                vec![AclEntry::group("eng", PermissionLevel::CanRun)],
            ))
        });

        let record = fetcher(plane)
            .fetch(ObjectKind::Queries, "q1")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(record.object_id, "q1");
        assert_eq!(record.object_kind, ObjectKind::Queries);
        assert_eq!(record.document().unwrap().access_control_list.len(), 1);
    }

    #[tokio::test]
    async fn soft_skips_missing_and_forbidden_objects() {
        for code in ["RESOURCE_NOT_FOUND", "RESOURCE_DOES_NOT_EXIST", "PERMISSION_DENIED"] {
            let mut plane = MockPlane::new();
            plane
                .expect_get_permissions()
                .times(1)
                .returning(move |_, _| Err(ControlPlaneError::new(code, "gone")));

            let fetched = fetcher(plane).fetch(ObjectKind::Alerts, "a1").await.unwrap();
            assert!(fetched.is_none(), "{code} should be skipped");
        }
    }

    #[tokio::test]
    async fn propagates_other_errors_as_retryable() {
        let mut plane = MockPlane::new();
        plane
            .expect_get_permissions()
            .times(1)
            .returning(|_, _| Err(ControlPlaneError::new("INTERNAL_ERROR", "boom")));

        let err = fetcher(plane)
            .fetch(ObjectKind::Dashboards, "d1")
            .await
            .unwrap_err();

        assert!(err.is_retryable());
        assert!(matches!(err, SyncError::ControlPlane { object, .. } if object.object_id == "d1"));
    }
}
