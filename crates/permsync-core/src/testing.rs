//! Mocks shared by unit tests

use crate::control_plane::ControlPlane;
use crate::error::ControlPlaneError;
use async_trait::async_trait;
use mockall::mock;
use permsync_acl::{AclDocument, AclEntry, ObjectKind};

mock! {
    pub(crate) Plane {}

    #[async_trait]
    impl ControlPlane for Plane {
        async fn get_permissions(
            &self,
            object_kind: ObjectKind,
            object_id: &str,
        ) -> Result<AclDocument, ControlPlaneError>;

        async fn set_permissions(
            &self,
            object_kind: ObjectKind,
            object_id: &str,
            acl: &[AclEntry],
        ) -> Result<AclDocument, ControlPlaneError>;
    }
}
