//! Crawl and apply drivers
//!
//! The two passes are decoupled so a snapshot can be reused or re-applied
//! without crawling again:
//! - **crawl**: listings -> rate-limited fetch -> snapshot store
//! - **apply**: snapshot -> relevance filter -> rewrite -> rate-limited set
//!
//! Every object is an independent task. A failing object is recorded in the
//! run report and never stops its siblings.

use crate::config::SyncConfig;
use crate::control_plane::{ControlPlane, ObjectListing};
use crate::error::SyncError;
use crate::fetcher::PermissionFetcher;
use crate::pool::{Completed, RunControl, WorkerPool};
use crate::rate_limit::RateLimiter;
use crate::report::{ApplyReport, CrawlReport, ListingFailure, ObjectFailure};
use crate::retry::RetryPolicy;
use crate::setter::PermissionSetter;
use crate::snapshot::SnapshotStore;
use chrono::Utc;
use futures::StreamExt;
use permsync_acl::{
    mentions_migrating_group, rewrite, AclDocument, AclEntry, Destination, GroupMigrationState,
    ObjectRef, PermissionRecord,
};
use std::sync::Arc;
use tracing::Instrument;

#[derive(Debug)]
enum CrawlOutcome {
    Crawled,
    Skipped,
    Failed(ObjectFailure),
}

#[derive(Debug)]
enum ApplyOutcome {
    Applied,
    Skipped,
    Failed(ObjectFailure),
}

/// Per-object work shared by every task of a run
#[derive(Debug)]
struct ObjectWorker {
    fetcher: PermissionFetcher,
    setter: PermissionSetter,
    retry: RetryPolicy,
}

impl ObjectWorker {
    async fn crawl_object(&self, object: ObjectRef, store: &dyn SnapshotStore) -> CrawlOutcome {
        let fetched = self
            .retry
            .run(|| self.fetcher.fetch(object.object_kind, &object.object_id))
            .await;

        let stored = match fetched {
            Ok(Some(record)) => store.append(record).await.map(|()| CrawlOutcome::Crawled),
            Ok(None) => Ok(CrawlOutcome::Skipped),
            Err(error) => Err(error),
        };

        stored.unwrap_or_else(|error| {
            tracing::error!(%object, %error, "failed to crawl permissions");
            CrawlOutcome::Failed(ObjectFailure::new(object, &error))
        })
    }

    async fn apply_record(
        &self,
        record: PermissionRecord,
        migration_state: &GroupMigrationState,
        destination: Destination,
    ) -> ApplyOutcome {
        let object = record.object_ref();
        match self
            .try_apply(&record, &object, migration_state, destination)
            .await
        {
            Ok(true) => ApplyOutcome::Applied,
            Ok(false) => ApplyOutcome::Skipped,
            Err(error) => {
                if error.is_invariant_violation() {
                    tracing::error!(%object, %error, "migration state is inconsistent with ACL");
                } else {
                    tracing::error!(%object, %error, "failed to apply permissions");
                }
                ApplyOutcome::Failed(ObjectFailure::new(object, &error))
            }
        }
    }

    /// Returns `Ok(false)` when nothing in the ACL is migrating
    async fn try_apply(
        &self,
        record: &PermissionRecord,
        object: &ObjectRef,
        migration_state: &GroupMigrationState,
        destination: Destination,
    ) -> Result<bool, SyncError> {
        let document = record.document()?;
        if !mentions_migrating_group(&document, migration_state) {
            tracing::debug!(%object, "no migrating groups, skipping");
            return Ok(false);
        }

        let acl = rewrite(&document.access_control_list, migration_state, destination)
            .map_err(|error| SyncError::from_acl(object, error))?;

        let applied = self
            .retry
            .run(|| self.setter.set(object.object_kind, &object.object_id, &acl))
            .await?;
        verify_applied(object, &acl, &applied);
        Ok(true)
    }
}

fn verify_applied(object: &ObjectRef, sent: &[AclEntry], applied: &AclDocument) {
    let missing = sent
        .iter()
        .filter(|entry| !applied.access_control_list.contains(entry))
        .count();
    if missing > 0 {
        tracing::warn!(%object, missing, "control plane did not keep every entry sent");
    }
}

/// Drives crawl and apply passes over all listed objects
#[derive(Debug)]
pub struct PermissionMigrator {
    worker: Arc<ObjectWorker>,
    max_in_flight: usize,
}

impl PermissionMigrator {
    /// Create a migrator with independent fetch and set limiters
    ///
    /// # Errors
    /// Returns [`SyncError::Config`] if `config` fails validation.
    pub fn new(control_plane: Arc<dyn ControlPlane>, config: &SyncConfig) -> Result<Self, SyncError> {
        config.validate()?;
        let fetch_limiter = Arc::new(RateLimiter::new("fetch", config.fetch_limit));
        let set_limiter = Arc::new(RateLimiter::new("set", config.set_limit));

        Ok(Self::from_parts(
            PermissionFetcher::new(Arc::clone(&control_plane), fetch_limiter),
            PermissionSetter::new(control_plane, set_limiter),
            RetryPolicy::new(config.retry),
            config.max_in_flight,
        ))
    }

    /// Assemble from pre-built components, e.g. to share limiters between migrators
    #[must_use]
    pub fn from_parts(
        fetcher: PermissionFetcher,
        setter: PermissionSetter,
        retry: RetryPolicy,
        max_in_flight: usize,
    ) -> Self {
        Self {
            worker: Arc::new(ObjectWorker {
                fetcher,
                setter,
                retry,
            }),
            max_in_flight,
        }
    }

    /// Crawl every listed object into `store`
    ///
    /// The store is cleared first. Objects reported missing or forbidden are
    /// skipped; other failures are recorded per object.
    ///
    /// # Errors
    /// Only store-level failures (clearing the snapshot) abort the run.
    pub async fn crawl(
        &self,
        listings: &[Arc<dyn ObjectListing>],
        store: Arc<dyn SnapshotStore>,
        control: &RunControl,
    ) -> Result<CrawlReport, SyncError> {
        let report = CrawlReport::start();
        let span = tracing::info_span!("crawl", run_id = %report.run_id);

        async move {
            let mut report = report;
            tracing::info!(listings = listings.len(), "starting crawl");
            store.begin_crawl().await?;

            let mut pool = WorkerPool::new(self.max_in_flight);
            'listings: for listing in listings {
                let object_kind = listing.object_kind();
                let mut ids = listing.list();

                while let Some(listed) = ids.next().await {
                    let object_id = match listed {
                        Ok(object_id) => object_id,
                        Err(source) => {
                            let error = SyncError::Listing {
                                kind: object_kind,
                                source,
                            };
                            tracing::warn!(%error, retryable = error.is_retryable(), "listing failed");
                            report.listing_failures.push(ListingFailure {
                                object_kind,
                                error: error.to_string(),
                            });
                            continue;
                        }
                    };

                    let object = ObjectRef::new(object_kind, object_id);
                    let worker = Arc::clone(&self.worker);
                    let store = Arc::clone(&store);
                    let task_object = object.clone();
                    let task = async move { worker.crawl_object(task_object, store.as_ref()).await };

                    if !pool.spawn(control, object, task).await {
                        report.cancelled = true;
                        break 'listings;
                    }
                    while let Some(completed) = pool.try_next() {
                        record_crawl(&mut report, completed);
                    }
                }
            }

            while let Some(completed) = pool.next().await {
                record_crawl(&mut report, completed);
            }
            report.finished_at = Some(Utc::now());

            tracing::info!(
                crawled = report.crawled,
                skipped = report.skipped,
                failed = report.failed,
                cancelled = report.cancelled,
                "crawl finished"
            );
            Ok(report)
        }
        .instrument(span)
        .await
    }

    /// Rewrite and set ACLs of every snapshot record that mentions a migrating group
    ///
    /// Records with no migrating grant are skipped without any remote call.
    ///
    /// # Errors
    /// Only a failure to read the snapshot aborts the run.
    pub async fn apply(
        &self,
        store: &dyn SnapshotStore,
        migration_state: Arc<GroupMigrationState>,
        destination: Destination,
        control: &RunControl,
    ) -> Result<ApplyReport, SyncError> {
        let report = ApplyReport::start(destination);
        let span = tracing::info_span!("apply", run_id = %report.run_id, ?destination);

        async move {
            let mut report = report;
            let records = store.records().await?;
            let total = records.len();
            tracing::info!(
                records = total,
                groups = migration_state.len(),
                "starting apply"
            );

            let mut pool = WorkerPool::new(self.max_in_flight);
            for record in records {
                let object = record.object_ref();
                let worker = Arc::clone(&self.worker);
                let migration_state = Arc::clone(&migration_state);
                let task = async move {
                    worker
                        .apply_record(record, &migration_state, destination)
                        .await
                };

                if !pool.spawn(control, object, task).await {
                    report.cancelled = true;
                    break;
                }
                while let Some(completed) = pool.try_next() {
                    record_apply(&mut report, completed);
                }
            }
            report.unattempted = total - pool.spawned();

            while let Some(completed) = pool.next().await {
                record_apply(&mut report, completed);
            }
            report.finished_at = Some(Utc::now());

            tracing::info!(
                applied = report.applied,
                skipped = report.skipped,
                failed = report.failed,
                unattempted = report.unattempted,
                "apply finished"
            );
            Ok(report)
        }
        .instrument(span)
        .await
    }
}

fn record_crawl(report: &mut CrawlReport, completed: Completed<CrawlOutcome>) {
    match completed {
        Completed::Finished(CrawlOutcome::Crawled) => report.crawled += 1,
        Completed::Finished(CrawlOutcome::Skipped) => report.skipped += 1,
        Completed::Finished(CrawlOutcome::Failed(failure)) => {
            report.failed += 1;
            report.failures.push(failure);
        }
        Completed::Panicked(object) => {
            let error = SyncError::TaskPanicked(object.clone());
            tracing::error!(%object, "crawl task panicked");
            report.failed += 1;
            report.failures.push(ObjectFailure::new(object, &error));
        }
    }
}

fn record_apply(report: &mut ApplyReport, completed: Completed<ApplyOutcome>) {
    match completed {
        Completed::Finished(ApplyOutcome::Applied) => report.applied += 1,
        Completed::Finished(ApplyOutcome::Skipped) => report.skipped += 1,
        Completed::Finished(ApplyOutcome::Failed(failure)) => {
            report.failed += 1;
            report.failures.push(failure);
        }
        Completed::Panicked(object) => {
            let error = SyncError::TaskPanicked(object.clone());
            tracing::error!(%object, "apply task panicked");
            report.failed += 1;
            report.failures.push(ObjectFailure::new(object, &error));
        }
    }
}
