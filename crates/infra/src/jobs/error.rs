//! Errors surfaced by the job lifecycle.

use jobhub_core::JobId;

use super::store::StoreError;

/// Job lifecycle error.
///
/// Registry and status lookups return these to the caller. Executor tasks only
/// log them.
#[derive(Debug, Clone, thiserror::Error)]
pub enum JobError {
    #[error("failed to persist job: {0}")]
    StoreWrite(#[source] StoreError),

    #[error("failed to read job: {0}")]
    StoreRead(#[source] StoreError),

    #[error("job not found: {0}")]
    NotFound(String),

    /// The completion update matched no row.
    #[error("job {0} was not updated: no matching record")]
    UpdateRace(JobId),

    /// Every consumer of the dispatch queue is gone.
    #[error("dispatch queue closed; job {0} was not created")]
    QueueClosed(JobId),
}

impl JobError {
    /// Stable snake_case code, suitable for transport error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            JobError::StoreWrite(_) | JobError::StoreRead(_) => "store_error",
            JobError::NotFound(_) => "not_found",
            JobError::UpdateRace(_) => "update_race",
            JobError::QueueClosed(_) => "queue_closed",
        }
    }
}
