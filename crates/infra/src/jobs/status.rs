//! Status lookups, read straight from the record store.

use tracing::debug;

use jobhub_core::{Job, JobId};

use super::error::JobError;
use super::store::SharedJobStore;

/// Looks up a job's current record. No caching.
#[derive(Clone)]
pub struct StatusReader {
    store: SharedJobStore,
}

impl StatusReader {
    pub fn new(store: SharedJobStore) -> Self {
        Self { store }
    }

    /// Look up a job by its textual identity.
    ///
    /// An identity that is not a valid job id cannot match any record and
    /// yields `NotFound` like any other unknown identity.
    pub async fn status(&self, job_id: &str) -> Result<Job, JobError> {
        match job_id.parse::<JobId>() {
            Ok(id) => self.status_of(id).await,
            Err(e) => {
                debug!(job_id = %job_id, error = %e, "unparseable job id");
                Err(JobError::NotFound(job_id.to_string()))
            }
        }
    }

    pub async fn status_of(&self, id: JobId) -> Result<Job, JobError> {
        self.store
            .select_by_id(id)
            .await
            .map_err(JobError::StoreRead)?
            .ok_or_else(|| JobError::NotFound(id.to_string()))
    }
}
