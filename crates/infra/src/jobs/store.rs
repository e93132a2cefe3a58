//! Job record storage boundary and the in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use jobhub_core::{Job, JobId, JobStatus};

/// Shared handle to the record store, passed explicitly to every component.
pub type SharedJobStore = Arc<dyn JobRecordStore>;

/// Minimal record store the job lifecycle needs.
///
/// Implementations must be safe for concurrent use: the same handle is shared
/// by the registry, every executor task and every status lookup.
#[async_trait::async_trait]
pub trait JobRecordStore: Send + Sync {
    /// Insert a new job record. Rejects an identity that already exists.
    async fn insert(&self, job: &Job) -> Result<(), StoreError>;

    /// Point lookup by identity. `Ok(None)` when no record matches.
    async fn select_by_id(&self, id: JobId) -> Result<Option<Job>, StoreError>;

    /// Set status and `updated_at` in one update; returns rows affected.
    async fn update_status_by_id(
        &self,
        id: JobId,
        status: JobStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<u64, StoreError>;
}

/// Record store error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("job already exists: {0}")]
    AlreadyExists(JobId),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("failed to decode job row: {0}")]
    Decode(String),
}

/// In-memory job store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<JobId, Job>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Snapshot of every stored job, oldest first.
    pub fn all(&self) -> Result<Vec<Job>, StoreError> {
        let jobs = self.jobs.read().map_err(poisoned)?;
        let mut result: Vec<_> = jobs.values().cloned().collect();
        result.sort_by_key(|j| j.created_at);
        Ok(result)
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.jobs.read().map_err(poisoned)?.len())
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> StoreError {
    StoreError::Storage("in-memory job store lock poisoned".to_string())
}

#[async_trait::async_trait]
impl JobRecordStore for InMemoryJobStore {
    async fn insert(&self, job: &Job) -> Result<(), StoreError> {
        let mut jobs = self.jobs.write().map_err(poisoned)?;
        if jobs.contains_key(&job.id) {
            return Err(StoreError::AlreadyExists(job.id));
        }
        jobs.insert(job.id, job.clone());
        Ok(())
    }

    async fn select_by_id(&self, id: JobId) -> Result<Option<Job>, StoreError> {
        let jobs = self.jobs.read().map_err(poisoned)?;
        Ok(jobs.get(&id).cloned())
    }

    async fn update_status_by_id(
        &self,
        id: JobId,
        status: JobStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let mut jobs = self.jobs.write().map_err(poisoned)?;
        match jobs.get_mut(&id) {
            Some(job) => {
                job.status = status;
                job.updated_at = updated_at;
                Ok(1)
            }
            None => Ok(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_and_select() {
        let store = InMemoryJobStore::new();
        let job = Job::new_pending(Utc::now());

        store.insert(&job).await.unwrap();

        let loaded = store.select_by_id(job.id).await.unwrap().unwrap();
        assert_eq!(loaded, job);
    }

    #[tokio::test]
    async fn duplicate_identity_is_rejected() {
        let store = InMemoryJobStore::new();
        let job = Job::new_pending(Utc::now());

        store.insert(&job).await.unwrap();
        let err = store.insert(&job).await.unwrap_err();

        assert!(matches!(err, StoreError::AlreadyExists(id) if id == job.id));
        assert_eq!(store.len().unwrap(), 1);
    }

    #[tokio::test]
    async fn select_unknown_is_none() {
        let store = InMemoryJobStore::new();
        assert!(store.select_by_id(JobId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_refreshes_status_and_timestamp() {
        let store = InMemoryJobStore::new();
        let job = Job::new_pending(Utc::now());
        store.insert(&job).await.unwrap();

        let later = job.created_at + chrono::Duration::seconds(5);
        let rows = store
            .update_status_by_id(job.id, JobStatus::Completed, later)
            .await
            .unwrap();
        assert_eq!(rows, 1);

        let loaded = store.select_by_id(job.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, JobStatus::Completed);
        assert_eq!(loaded.updated_at, later);
        assert_eq!(loaded.created_at, job.created_at);
    }

    #[tokio::test]
    async fn update_unknown_affects_zero_rows() {
        let store = InMemoryJobStore::new();
        let rows = store
            .update_status_by_id(JobId::new(), JobStatus::Completed, Utc::now())
            .await
            .unwrap();
        assert_eq!(rows, 0);
    }
}
