//! Group migration state
//!
//! A completed migration plan: for every migrating group, its workspace
//! identity (the name found in ACLs today), a temporary backup identity and
//! the final account identity. The plan is supplied externally and is
//! read-only here.

use crate::error::AclError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A group identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub display_name: String,
}

impl Group {
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

/// Which identity of a migrating group an apply run writes into ACLs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    /// Original workspace group (rollback)
    Workspace,
    /// Temporary backup group
    Backup,
    /// Account-level group
    Account,
}

/// Identities of one migrating group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMigrationInfo {
    pub workspace: Group,
    pub backup: Group,
    pub account: Group,
}

impl GroupMigrationInfo {
    #[inline]
    #[must_use]
    pub fn new(workspace: Group, backup: Group, account: Group) -> Self {
        Self {
            workspace,
            backup,
            account,
        }
    }

    /// Name currently granted in ACLs
    #[inline]
    #[must_use]
    pub fn source_name(&self) -> &str {
        &self.workspace.display_name
    }

    /// Identity selected by `destination`
    #[inline]
    #[must_use]
    pub fn destination(&self, destination: Destination) -> &Group {
        match destination {
            Destination::Workspace => &self.workspace,
            Destination::Backup => &self.backup,
            Destination::Account => &self.account,
        }
    }
}

/// Ordered set of migrating groups, keyed by workspace display name
///
/// Matching is by display name, case-sensitive. A group renamed between
/// planning and apply will not match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<GroupMigrationInfo>", into = "Vec<GroupMigrationInfo>")]
pub struct GroupMigrationState {
    groups: IndexMap<String, GroupMigrationInfo>,
}

impl GroupMigrationState {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a list of migration entries
    ///
    /// # Errors
    /// Returns [`AclError::DuplicateSourceGroup`] if two entries share a
    /// workspace display name.
    pub fn from_groups(
        groups: impl IntoIterator<Item = GroupMigrationInfo>,
    ) -> Result<Self, AclError> {
        let mut state = Self::new();
        for info in groups {
            state.add(info)?;
        }
        Ok(state)
    }

    /// Add one migrating group
    ///
    /// # Errors
    /// Returns [`AclError::DuplicateSourceGroup`] if the source name is taken.
    pub fn add(&mut self, info: GroupMigrationInfo) -> Result<(), AclError> {
        let name = info.source_name().to_string();
        if self.groups.contains_key(&name) {
            return Err(AclError::DuplicateSourceGroup(name));
        }
        self.groups.insert(name, info);
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn get_by_workspace_group_name(&self, name: &str) -> Option<&GroupMigrationInfo> {
        self.groups.get(name)
    }

    /// Whether `name` is a source name under migration
    #[inline]
    #[must_use]
    pub fn is_migrating(&self, name: &str) -> bool {
        self.groups.contains_key(name)
    }

    pub fn groups(&self) -> impl Iterator<Item = &GroupMigrationInfo> {
        self.groups.values()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl TryFrom<Vec<GroupMigrationInfo>> for GroupMigrationState {
    type Error = AclError;

    fn try_from(groups: Vec<GroupMigrationInfo>) -> Result<Self, Self::Error> {
        Self::from_groups(groups)
    }
}

impl From<GroupMigrationState> for Vec<GroupMigrationInfo> {
    fn from(state: GroupMigrationState) -> Self {
        state.groups.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(name: &str) -> GroupMigrationInfo {
        GroupMigrationInfo::new(
            Group::new(format!("{name}-id"), name),
            Group::new(format!("{name}-bk-id"), format!("db-temp-{name}")),
            Group::new(format!("{name}-acct-id"), format!("{name}-acct")),
        )
    }

    #[test]
    fn rejects_duplicate_source_names() {
        let result = GroupMigrationState::from_groups(vec![info("eng"), info("eng")]);
        assert!(matches!(result, Err(AclError::DuplicateSourceGroup(n)) if n == "eng"));
    }

    #[test]
    fn selects_destination_identity() {
        let info = info("eng");
        assert_eq!(info.destination(Destination::Workspace).display_name, "eng");
        assert_eq!(info.destination(Destination::Backup).display_name, "db-temp-eng");
        assert_eq!(info.destination(Destination::Account).display_name, "eng-acct");
    }

    #[test]
    fn lookup_is_case_sensitive() {
        let state = GroupMigrationState::from_groups(vec![info("Eng")]).unwrap();
        assert!(state.is_migrating("Eng"));
        assert!(!state.is_migrating("eng"));
        assert!(state.get_by_workspace_group_name("eng").is_none());
    }

    #[test]
    fn preserves_insertion_order() {
        let state =
            GroupMigrationState::from_groups(vec![info("b"), info("a"), info("c")]).unwrap();
        let names: Vec<_> = state.groups().map(GroupMigrationInfo::source_name).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn deserialization_enforces_unique_sources() {
        let json = serde_json::to_string(&vec![info("x"), info("x")]).unwrap();
        assert!(serde_json::from_str::<GroupMigrationState>(&json).is_err());

        let json = serde_json::to_string(&vec![info("x"), info("y")]).unwrap();
        let state: GroupMigrationState = serde_json::from_str(&json).unwrap();
        assert_eq!(state.len(), 2);
    }
}
