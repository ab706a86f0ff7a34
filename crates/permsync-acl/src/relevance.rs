//! Relevance filter
//!
//! Decides whether a snapshot record needs the rewrite/apply path at all.
//! A false negative silently drops a migration, so an unparseable record is
//! an error rather than "not relevant".

use crate::error::AclError;
use crate::migration::GroupMigrationState;
use crate::types::{AclDocument, PermissionRecord};

/// Whether `record` grants anything to a group under migration
///
/// # Errors
/// Returns [`AclError::MalformedDocument`] if the stored ACL does not parse.
pub fn is_relevant(
    record: &PermissionRecord,
    migration_state: &GroupMigrationState,
) -> Result<bool, AclError> {
    let document = record.document()?;
    Ok(mentions_migrating_group(&document, migration_state))
}

/// Whether any group entry of `document` is a migration source
#[inline]
#[must_use]
pub fn mentions_migrating_group(
    document: &AclDocument,
    migration_state: &GroupMigrationState,
) -> bool {
    document
        .group_names()
        .any(|name| migration_state.is_migrating(name))
}
