//! Worker pool for per-object tasks
//!
//! Tasks run on the tokio runtime in parallel, capped at `max_in_flight`.
//! Cancelling a run stops new tasks from being spawned; tasks already
//! running finish so no object is left with a half-applied ACL.

use futures::FutureExt;
use permsync_acl::ObjectRef;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;

/// Cancellation handle for a crawl or apply run
#[derive(Debug, Clone)]
pub struct RunControl {
    cancel_tx: Arc<watch::Sender<bool>>,
}

impl RunControl {
    #[must_use]
    pub fn new() -> Self {
        let (cancel_tx, _cancel_rx) = watch::channel(false);
        Self {
            cancel_tx: Arc::new(cancel_tx),
        }
    }

    /// Stop scheduling new objects
    pub fn cancel(&self) {
        self.cancel_tx.send_replace(true);
    }

    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.cancel_tx.borrow()
    }

    /// Resolves once [`Self::cancel`] has been called
    pub async fn cancelled(&self) {
        let mut cancel_rx = self.cancel_tx.subscribe();
        loop {
            if *cancel_rx.borrow_and_update() {
                return;
            }
            if cancel_rx.changed().await.is_err() {
                return;
            }
        }
    }
}

impl Default for RunControl {
    fn default() -> Self {
        Self::new()
    }
}

/// How a spawned task ended
#[derive(Debug)]
pub(crate) enum Completed<T> {
    Finished(T),
    Panicked(ObjectRef),
}

/// Bounded set of running object tasks
pub(crate) struct WorkerPool<T> {
    permits: Arc<Semaphore>,
    tasks: JoinSet<Completed<T>>,
    spawned: usize,
}

impl<T: Send + 'static> WorkerPool<T> {
    pub(crate) fn new(max_in_flight: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_in_flight.max(1))),
            tasks: JoinSet::new(),
            spawned: 0,
        }
    }

    pub(crate) fn spawned(&self) -> usize {
        self.spawned
    }

    /// Wait for a free slot and spawn `task` for `object`
    ///
    /// Returns `false` without spawning if the run is cancelled first.
    pub(crate) async fn spawn<F>(&mut self, control: &RunControl, object: ObjectRef, task: F) -> bool
    where
        F: Future<Output = T> + Send + 'static,
    {
        if control.is_cancelled() {
            return false;
        }
        let permit = tokio::select! {
            biased;
            () = control.cancelled() => return false,
            permit = Arc::clone(&self.permits).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => return false,
            },
        };

        self.tasks.spawn(async move {
            let _permit = permit;
            match AssertUnwindSafe(task).catch_unwind().await {
                Ok(output) => Completed::Finished(output),
                Err(_) => Completed::Panicked(object),
            }
        });
        self.spawned += 1;
        true
    }

    /// Next completed task, if one is already done
    pub(crate) fn try_next(&mut self) -> Option<Completed<T>> {
        loop {
            match self.tasks.try_join_next()? {
                Ok(completed) => return Some(completed),
                Err(error) => tracing::error!(%error, "worker task failed to join"),
            }
        }
    }

    /// Wait for the next task; `None` once every task has finished
    pub(crate) async fn next(&mut self) -> Option<Completed<T>> {
        loop {
            match self.tasks.join_next().await? {
                Ok(completed) => return Some(completed),
                Err(error) => tracing::error!(%error, "worker task failed to join"),
            }
        }
    }
}
