//! Testing utilities for permsync workspace
//!
//! Shared fakes, fixtures, and tracing setup.

#![allow(missing_docs)]

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use permsync_acl::{
    AclDocument, AclEntry, Group, GroupMigrationInfo, GroupMigrationState, ObjectKind, ObjectRef,
};
use permsync_core::{ControlPlane, ControlPlaneError, FnListing, ObjectListing};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// One recorded `set_permissions` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCall {
    pub object: ObjectRef,
    pub acl: Vec<AclEntry>,
}

/// In-memory control plane with call recording and error injection
#[derive(Debug, Default)]
pub struct FakeControlPlane {
    acls: DashMap<ObjectRef, AclDocument>,
    get_failures: DashMap<ObjectRef, VecDeque<ControlPlaneError>>,
    set_failures: DashMap<ObjectRef, VecDeque<ControlPlaneError>>,
    get_calls: AtomicUsize,
    set_calls: Mutex<Vec<SetCall>>,
}

impl FakeControlPlane {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the ACL of one object
    pub fn with_acl(self, kind: ObjectKind, id: &str, acl: Vec<AclEntry>) -> Self {
        let object = ObjectRef::new(kind, id);
        let document = AclDocument::new(&object, acl);
        self.acls.insert(object, document);
        self
    }

    /// Fail the next `times` reads of an object with `code`
    pub fn fail_get(&self, kind: ObjectKind, id: &str, code: &str, times: usize) {
        push_failures(&self.get_failures, ObjectRef::new(kind, id), code, times);
    }

    /// Fail the next `times` writes of an object with `code`
    pub fn fail_set(&self, kind: ObjectKind, id: &str, code: &str, times: usize) {
        push_failures(&self.set_failures, ObjectRef::new(kind, id), code, times);
    }

    /// Current remote ACL of an object
    pub fn acl(&self, kind: ObjectKind, id: &str) -> Option<Vec<AclEntry>> {
        self.acls
            .get(&ObjectRef::new(kind, id))
            .map(|doc| doc.access_control_list.clone())
    }

    pub fn get_call_count(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn set_calls(&self) -> Vec<SetCall> {
        self.set_calls.lock().clone()
    }

    /// Listing over the seeded objects of `kind`, plus `extra_ids`
    pub fn listing(self: &Arc<Self>, kind: ObjectKind, extra_ids: &[&str]) -> Arc<dyn ObjectListing> {
        let mut ids: Vec<String> = self
            .acls
            .iter()
            .filter(|entry| entry.key().object_kind == kind)
            .map(|entry| entry.key().object_id.clone())
            .collect();
        ids.sort();
        ids.extend(extra_ids.iter().map(|id| (*id).to_string()));
        listing_of(kind, ids)
    }

    fn take_failure(
        failures: &DashMap<ObjectRef, VecDeque<ControlPlaneError>>,
        object: &ObjectRef,
    ) -> Option<ControlPlaneError> {
        failures.get_mut(object).and_then(|mut queue| queue.pop_front())
    }
}

fn push_failures(
    failures: &DashMap<ObjectRef, VecDeque<ControlPlaneError>>,
    object: ObjectRef,
    code: &str,
    times: usize,
) {
    let mut queue = failures.entry(object).or_default();
    for _ in 0..times {
        queue.push_back(ControlPlaneError::new(code, "injected failure"));
    }
}

#[async_trait]
impl ControlPlane for FakeControlPlane {
    async fn get_permissions(
        &self,
        object_kind: ObjectKind,
        object_id: &str,
    ) -> Result<AclDocument, ControlPlaneError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        let object = ObjectRef::new(object_kind, object_id);
        if let Some(error) = Self::take_failure(&self.get_failures, &object) {
            return Err(error);
        }
        self.acls
            .get(&object)
            .map(|doc| doc.value().clone())
            .ok_or_else(|| ControlPlaneError::new("RESOURCE_DOES_NOT_EXIST", object.to_string()))
    }

    async fn set_permissions(
        &self,
        object_kind: ObjectKind,
        object_id: &str,
        acl: &[AclEntry],
    ) -> Result<AclDocument, ControlPlaneError> {
        let object = ObjectRef::new(object_kind, object_id);
        self.set_calls.lock().push(SetCall {
            object: object.clone(),
            acl: acl.to_vec(),
        });
        if let Some(error) = Self::take_failure(&self.set_failures, &object) {
            return Err(error);
        }
        let document = AclDocument::new(&object, acl.to_vec());
        self.acls.insert(object, document.clone());
        Ok(document)
    }
}

/// Listing of fixed ids
pub fn listing_of(kind: ObjectKind, ids: Vec<String>) -> Arc<dyn ObjectListing> {
    Arc::new(FnListing::new(kind, move || {
        let ids = ids.clone();
        async move { Ok::<_, ControlPlaneError>(ids) }
    }))
}

/// Listing whose enumeration fails with `code`
pub fn failing_listing(kind: ObjectKind, code: &'static str) -> Arc<dyn ObjectListing> {
    Arc::new(FnListing::new(kind, move || async move {
        Err::<Vec<String>, _>(ControlPlaneError::new(code, "listing failed"))
    }))
}

/// Migration info for `workspace` with backup `db-temp-<workspace>` and account `account`
pub fn migration_info(workspace: &str, account: &str) -> GroupMigrationInfo {
    GroupMigrationInfo::new(
        Group::new(format!("ws-{workspace}"), workspace),
        Group::new(format!("bk-{workspace}"), format!("db-temp-{workspace}")),
        Group::new(format!("acct-{account}"), account),
    )
}

/// Migration plan from `(workspace, account)` name pairs
pub fn migration_state(pairs: &[(&str, &str)]) -> Arc<GroupMigrationState> {
    let state = GroupMigrationState::from_groups(
        pairs
            .iter()
            .map(|(workspace, account)| migration_info(workspace, account)),
    )
    .unwrap();
    Arc::new(state)
}

/// Route `tracing` output to the test writer, honoring `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
