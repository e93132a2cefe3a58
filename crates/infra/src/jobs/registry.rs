//! Job creation: reserve a queue slot, persist, then hand the job over.
//!
//! The slot is taken before the insert so a caller that gives up while the
//! queue is full leaves no stored row behind.

use chrono::Utc;
use tracing::{debug, info, warn};

use jobhub_core::Job;

use super::error::JobError;
use super::queue::DispatchSender;
use super::store::SharedJobStore;

/// Creates job records and submits them for execution.
///
/// Cheap to clone; every clone shares the store handle and the queue sender.
#[derive(Clone)]
pub struct JobRegistry {
    store: SharedJobStore,
    queue: DispatchSender,
}

impl JobRegistry {
    pub fn new(store: SharedJobStore, queue: DispatchSender) -> Self {
        Self { store, queue }
    }

    /// Create a pending job, persist it and enqueue it.
    ///
    /// Waits for a free slot when the queue is full. Nothing is stored or
    /// enqueued if the queue is closed, the insert fails, or the returned
    /// future is dropped while waiting.
    pub async fn create(&self) -> Result<Job, JobError> {
        let job = Job::new_pending(Utc::now());

        let permit = match self.queue.reserve().await {
            Ok(permit) => permit,
            Err(_) => {
                warn!(job_id = %job.id, "dispatch queue closed; job not created");
                return Err(JobError::QueueClosed(job.id));
            }
        };

        if let Err(e) = self.store.insert(&job).await {
            warn!(job_id = %job.id, error = %e, "failed to persist job");
            return Err(JobError::StoreWrite(e));
        }
        debug!(job_id = %job.id, "job persisted");

        permit.send(job.clone());
        info!(job_id = %job.id, status = %job.status, "job created");
        Ok(job)
    }
}
