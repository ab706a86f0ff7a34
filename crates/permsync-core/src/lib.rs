//! permsync Core - workspace permission migration
//!
//! Moves SQL object ACLs from workspace groups to their replacement groups
//! in two decoupled passes:
//! - **Crawl**: list objects, fetch each ACL under the fetch quota, and
//!   snapshot it
//! - **Apply**: for snapshot records granting a migrating group, rewrite the
//!   ACL and replace it remotely under the set quota
//!
//! # Example
//!
//! ```rust,ignore
//! use permsync_core::{InMemorySnapshotStore, PermissionMigrator, RunControl, SyncConfig};
//! use permsync_acl::Destination;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let migrator = PermissionMigrator::new(control_plane, &SyncConfig::new())?;
//! let store = Arc::new(InMemorySnapshotStore::new());
//! let control = RunControl::new();
//!
//! let crawl = migrator.crawl(&listings, store.clone(), &control).await?;
//! let apply = migrator
//!     .apply(store.as_ref(), migration_state, Destination::Account, &control)
//!     .await?;
//! println!("applied {} of {} crawled", apply.applied, crawl.crawled);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod config;
pub mod control_plane;
pub mod error;
pub mod fetcher;
pub mod migrator;
pub mod pool;
pub mod rate_limit;
pub mod report;
pub mod retry;
pub mod setter;
pub mod snapshot;

#[cfg(test)]
mod testing;

pub use config::{RateLimitConfig, RetryConfig, SyncConfig};
pub use control_plane::{ControlPlane, FnListing, ObjectListing};
pub use error::{ControlPlaneError, ErrorCode, SyncError};
pub use fetcher::PermissionFetcher;
pub use migrator::PermissionMigrator;
pub use pool::RunControl;
pub use rate_limit::RateLimiter;
pub use report::{ApplyReport, CrawlReport, ListingFailure, ObjectFailure, RunId};
pub use retry::RetryPolicy;
pub use setter::PermissionSetter;
pub use snapshot::{InMemorySnapshotStore, SnapshotStore};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for running a migration
    pub use crate::{
        ControlPlane, InMemorySnapshotStore, ObjectListing, PermissionMigrator, RunControl,
        SnapshotStore, SyncConfig,
    };
    pub use permsync_acl::{Destination, GroupMigrationState, ObjectKind};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
