//! Remote control plane and listing sources
//!
//! The transport and authentication live behind these traits. All object
//! kinds share one permissions endpoint, selected by [`ObjectKind`].

use crate::error::ControlPlaneError;
use async_trait::async_trait;
use futures::future;
use futures::stream::{self, BoxStream, StreamExt};
use permsync_acl::{AclDocument, AclEntry, ObjectKind};
use std::fmt;
use std::future::Future;

/// Permission API of the remote control plane
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Read the ACL document of one object
    async fn get_permissions(
        &self,
        object_kind: ObjectKind,
        object_id: &str,
    ) -> Result<AclDocument, ControlPlaneError>;

    /// Replace the ACL of one object and return the resulting document
    ///
    /// There is no incremental update: entries missing from `acl` are revoked.
    async fn set_permissions(
        &self,
        object_kind: ObjectKind,
        object_id: &str,
        acl: &[AclEntry],
    ) -> Result<AclDocument, ControlPlaneError>;
}

/// Enumerates the ids of all objects of one kind
pub trait ObjectListing: Send + Sync {
    fn object_kind(&self) -> ObjectKind;

    /// Lazily list object ids; an `Err` item reports a listing failure
    fn list(&self) -> BoxStream<'_, Result<String, ControlPlaneError>>;
}

/// Adapts an async function returning all ids of a kind into an [`ObjectListing`]
pub struct FnListing<F> {
    object_kind: ObjectKind,
    list_fn: F,
}

impl<F> FnListing<F> {
    #[inline]
    #[must_use]
    pub fn new(object_kind: ObjectKind, list_fn: F) -> Self {
        Self {
            object_kind,
            list_fn,
        }
    }
}

impl<F> fmt::Debug for FnListing<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnListing")
            .field("object_kind", &self.object_kind)
            .finish_non_exhaustive()
    }
}

impl<F, Fut> ObjectListing for FnListing<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<String>, ControlPlaneError>> + Send + 'static,
{
    fn object_kind(&self) -> ObjectKind {
        self.object_kind
    }

    fn list(&self) -> BoxStream<'_, Result<String, ControlPlaneError>> {
        stream::once((self.list_fn)())
            .map(|listed| match listed {
                Ok(ids) => stream::iter(ids).map(Ok).left_stream(),
                Err(error) => stream::once(future::ready(Err(error))).right_stream(),
            })
            .flatten()
            .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fn_listing_yields_ids() {
        let listing = FnListing::new(ObjectKind::Dashboards, || async {
            Ok::<_, ControlPlaneError>(vec!["d1".to_string(), "d2".to_string()])
        });

        let ids: Vec<_> = listing.list().collect().await;

        assert_eq!(listing.object_kind(), ObjectKind::Dashboards);
        assert_eq!(ids, vec![Ok("d1".to_string()), Ok("d2".to_string())]);
    }

    #[tokio::test]
    async fn fn_listing_surfaces_failure() {
        let listing = FnListing::new(ObjectKind::Alerts, || async {
            Err::<Vec<String>, _>(ControlPlaneError::new("INTERNAL_ERROR", "listing down"))
        });

        let items: Vec<_> = listing.list().collect().await;

        assert_eq!(items.len(), 1);
        assert!(items[0].is_err());
    }
}
