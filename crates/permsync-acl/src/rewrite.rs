//! ACL rewriting
//!
//! The control plane only supports full replacement of an ACL, so the
//! rewrite is total: every input entry yields exactly one output entry, with
//! migrating groups renamed and everything else copied unchanged.

use crate::error::AclError;
use crate::migration::{Destination, GroupMigrationState};
use crate::types::AclEntry;

/// Rewrite `entries` so migrating groups point at `destination`
///
/// # Arguments
/// * `entries` - ACL entries as fetched
/// * `migration_state` - Completed migration plan
/// * `destination` - Identity to grant instead of the workspace group
///
/// # Returns
/// A new list of the same length. Order is preserved. Entries for users and
/// for groups outside the plan are cloned as-is; the permission level of a
/// renamed entry is kept.
///
/// # Errors
/// Returns [`AclError::MissingMigrationInfo`] if a group name matches the
/// plan but its migration info cannot be resolved.
pub fn rewrite(
    entries: &[AclEntry],
    migration_state: &GroupMigrationState,
    destination: Destination,
) -> Result<Vec<AclEntry>, AclError> {
    entries
        .iter()
        .map(|entry| rewrite_entry(entry, migration_state, destination))
        .collect()
}

fn rewrite_entry(
    entry: &AclEntry,
    migration_state: &GroupMigrationState,
    destination: Destination,
) -> Result<AclEntry, AclError> {
    let Some(group_name) = entry
        .group_name
        .as_deref()
        .filter(|name| migration_state.is_migrating(name))
    else {
        // no changes shall be applied
        return Ok(entry.clone());
    };

    let info = migration_state
        .get_by_workspace_group_name(group_name)
        .ok_or_else(|| AclError::MissingMigrationInfo(group_name.to_string()))?;

    Ok(entry.with_group_name(info.destination(destination).display_name.clone()))
}
