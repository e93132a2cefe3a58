//! The job record and its status lifecycle.

use core::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::id::JobId;

/// Job status lifecycle.
///
/// `Pending` is the only state a job is ever inserted with. `Failed` is only
/// written when the executor runs with the `mark_failed` failure policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl core::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(DomainError::validation(format!("unknown job status: {other}"))),
        }
    }
}

/// A job record.
///
/// Wire form uses the field names `id`, `createAt`, `updateAt`, `status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    #[serde(rename = "createAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updateAt")]
    pub updated_at: DateTime<Utc>,
    pub status: JobStatus,
}

impl Job {
    /// A fresh pending job with a new identity, stamped at `now`.
    ///
    /// Timestamps keep microsecond precision, the resolution of the
    /// Postgres store, so a stored job reads back equal to the created one.
    pub fn new_pending(now: DateTime<Utc>) -> Self {
        let now = now.trunc_subsecs(6);
        Self {
            id: JobId::new(),
            created_at: now,
            updated_at: now,
            status: JobStatus::Pending,
        }
    }

    /// Rebuild a job from stored fields, checking the timestamp invariant.
    pub fn from_record(
        id: JobId,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        status: JobStatus,
    ) -> DomainResult<Self> {
        if updated_at < created_at {
            return Err(DomainError::invariant(format!(
                "job {id}: updated_at {updated_at} precedes created_at {created_at}"
            )));
        }
        Ok(Self {
            id,
            created_at,
            updated_at,
            status,
        })
    }

    /// Timestamp to record for a transition observed at `now`.
    ///
    /// Clamped so that `updated_at >= created_at` holds even if the wall clock
    /// stepped backwards since creation.
    pub fn transition_timestamp(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.trunc_subsecs(6).max(self.created_at)
    }

    /// Apply a status transition in memory.
    ///
    /// Terminal jobs never transition again.
    pub fn transition(&mut self, status: JobStatus, now: DateTime<Utc>) -> DomainResult<()> {
        if self.status.is_terminal() {
            return Err(DomainError::invariant(format!(
                "job {} is already {}",
                self.id, self.status
            )));
        }
        self.updated_at = self.transition_timestamp(now);
        self.status = status;
        Ok(())
    }
}
