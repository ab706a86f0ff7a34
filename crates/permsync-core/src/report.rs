//! Aggregate results of crawl and apply runs

use crate::error::SyncError;
use chrono::{DateTime, Utc};
use permsync_acl::{Destination, ObjectKind, ObjectRef};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unique run identifier (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RunId(pub Ulid);

impl RunId {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One object that could not be crawled or applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectFailure {
    pub object: ObjectRef,
    pub error: String,
    /// Whether a later run could succeed without fixing anything
    pub retryable: bool,
    /// Migration state disagrees with the ACL; needs a human
    pub invariant_violation: bool,
}

impl ObjectFailure {
    #[must_use]
    pub fn new(object: ObjectRef, error: &SyncError) -> Self {
        Self {
            object,
            error: error.to_string(),
            retryable: error.is_retryable(),
            invariant_violation: error.is_invariant_violation(),
        }
    }
}

/// A listing that failed to enumerate its objects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingFailure {
    pub object_kind: ObjectKind,
    pub error: String,
}

/// Result of a crawl pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlReport {
    pub run_id: RunId,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Records written to the snapshot
    pub crawled: usize,
    /// Objects not found or forbidden
    pub skipped: usize,
    pub failed: usize,
    /// Run stopped scheduling new objects before the listings were exhausted
    pub cancelled: bool,
    pub failures: Vec<ObjectFailure>,
    pub listing_failures: Vec<ListingFailure>,
}

impl CrawlReport {
    pub(crate) fn start() -> Self {
        Self {
            run_id: RunId::new(),
            started_at: Utc::now(),
            finished_at: None,
            crawled: 0,
            skipped: 0,
            failed: 0,
            cancelled: false,
            failures: Vec::new(),
            listing_failures: Vec::new(),
        }
    }

    /// No object or listing failed
    #[inline]
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.listing_failures.is_empty() && !self.cancelled
    }
}

/// Result of an apply pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyReport {
    pub run_id: RunId,
    pub destination: Destination,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Objects whose ACL was rewritten and set
    pub applied: usize,
    /// Objects with no migrating grant; no remote call made
    pub skipped: usize,
    pub failed: usize,
    /// Snapshot records never scheduled because the run was cancelled
    pub unattempted: usize,
    pub cancelled: bool,
    pub failures: Vec<ObjectFailure>,
}

impl ApplyReport {
    pub(crate) fn start(destination: Destination) -> Self {
        Self {
            run_id: RunId::new(),
            destination,
            started_at: Utc::now(),
            finished_at: None,
            applied: 0,
            skipped: 0,
            failed: 0,
            unattempted: 0,
            cancelled: false,
            failures: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed == 0 && !self.cancelled
    }

    /// Failures that point at a migration state bug
    pub fn invariant_violations(&self) -> impl Iterator<Item = &ObjectFailure> {
        self.failures.iter().filter(|f| f.invariant_violation)
    }
}
