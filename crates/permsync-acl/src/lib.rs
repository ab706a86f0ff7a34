//! permsync ACL model
//!
//! Pure data model for SQL object permissions and the migration rewrite.
//!
//! # Core Concepts
//!
//! - [`PermissionRecord`]: crawl-time snapshot of one object's ACL
//! - [`AclEntry`]: one principal/permission grant
//! - [`GroupMigrationState`]: completed plan of workspace -> backup -> account groups
//! - [`rewrite`]: total, order-preserving ACL rewrite
//! - [`is_relevant`]: filter used to skip objects with no migrating grants
//!
//! # Example
//!
//! ```rust,ignore
//! use permsync_acl::{rewrite, AclEntry, Destination, PermissionLevel};
//!
//! let acl = vec![AclEntry::group("eng-ws", PermissionLevel::CanRun)];
//! let new_acl = rewrite(&acl, &migration_state, Destination::Account)?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod error;
mod migration;
mod relevance;
mod rewrite;
mod types;

pub use error::AclError;
pub use migration::{Destination, Group, GroupMigrationInfo, GroupMigrationState};
pub use relevance::{is_relevant, mentions_migrating_group};
pub use rewrite::rewrite;
pub use types::{AclDocument, AclEntry, ObjectKind, ObjectRef, PermissionLevel, PermissionRecord};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
