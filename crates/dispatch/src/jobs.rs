//! Job queues and the fetch flow.
//!
//! A fetch request moves through
//! `AUTH_CHECK → VERSION_CHECK → POP → (EMPTY | JOB_FOUND) → RESPOND`.
//! Authentication happens at the HTTP boundary; [`Dispatcher::fetch`] covers
//! everything from the version check onwards.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::gate::check_compatibility;
use crate::{
    CompatibilityRequirements, DispatchError, Job, KeySpace, LastSeenTracker, QueueName,
    QueueStore, StoreError, Timestamp, WorkerIdentity,
};

/// Named FIFO job channels over a [`QueueStore`].
#[derive(Clone)]
pub struct JobQueue {
    store: Arc<dyn QueueStore>,
    keys: KeySpace,
}

impl JobQueue {
    pub fn new(store: Arc<dyn QueueStore>, keys: KeySpace) -> Self {
        Self { store, keys }
    }

    /// Appends a job at the tail of `queue`.
    pub async fn push(&self, queue: &QueueName, job: &Job) -> Result<(), DispatchError> {
        let item = serde_json::to_string(job)
            .map_err(|source| DispatchError::Serialization { what: "job", source })?;
        self.store.push_back(&self.keys.queue(queue), item).await?;
        Ok(())
    }

    /// Removes and returns the oldest job of `queue`.
    ///
    /// An empty queue is `Ok(None)`. An item that is not a valid job has
    /// still been consumed and is reported as
    /// [`DispatchError::MalformedQueuedItem`].
    pub async fn pop(&self, queue: &QueueName) -> Result<Option<Job>, DispatchError> {
        let Some(raw) = self.store.pop_front(&self.keys.queue(queue)).await? else {
            return Ok(None);
        };

        serde_json::from_str(&raw).map(Some).map_err(|e| {
            error!(
                queue = %queue,
                error = %e,
                length = raw.len(),
                "Discarding malformed queued item"
            );
            DispatchError::MalformedQueuedItem {
                queue: queue.clone(),
                reason: e.to_string(),
            }
        })
    }

    /// Number of jobs waiting in `queue`.
    pub async fn len(&self, queue: &QueueName) -> Result<u64, StoreError> {
        self.store.list_len(&self.keys.queue(queue)).await
    }
}

/// Hands jobs to admitted workers and records their liveness.
#[derive(Clone)]
pub struct Dispatcher {
    jobs: JobQueue,
    tracker: LastSeenTracker,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn QueueStore>, keys: KeySpace) -> Self {
        Self {
            tracker: LastSeenTracker::new(Arc::clone(&store), &keys),
            jobs: JobQueue::new(store, keys),
        }
    }

    pub fn jobs(&self) -> &JobQueue {
        &self.jobs
    }

    pub fn tracker(&self) -> &LastSeenTracker {
        &self.tracker
    }

    /// Serves one job to an authenticated worker.
    ///
    /// The version gate runs first; an outdated worker touches neither the
    /// queue nor the last-seen hash. An admitted worker is recorded as seen
    /// whether or not a job is available. A failed liveness write is logged
    /// and does not prevent the handoff.
    pub async fn fetch(
        &self,
        requirements: &CompatibilityRequirements,
        worker: &WorkerIdentity,
        queue: &QueueName,
    ) -> Result<Option<Job>, DispatchError> {
        check_compatibility(requirements, &worker.versions)?;

        if let Err(e) = self.tracker.record(&worker.host, Timestamp::now()).await {
            warn!(host = %worker.host, error = %e, "Failed to record last-seen");
        }

        let job = self.jobs.pop(queue).await?;
        match &job {
            Some(job) => info!(
                queue = %queue,
                host = %worker.host,
                branch = job.branch().unwrap_or("<none>"),
                "Job dispatched"
            ),
            None => debug!(queue = %queue, host = %worker.host, "Queue empty"),
        }
        Ok(job)
    }
}
