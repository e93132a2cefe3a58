//! Job lifecycle: create, dispatch, complete, look up.
//!
//! ## Design
//!
//! - A job is persisted `pending` before anything can consume it
//! - A bounded queue carries created jobs to the executor; producers wait when it is full
//! - The executor completes each job on its own task; failures are logged, never retried
//! - Status lookups always read the record store
//!
//! ## Components
//!
//! - `JobRecordStore`: insert / select / update of job records (in-memory or Postgres)
//! - `JobRegistry`: creates jobs
//! - `dispatch_queue`: the bounded queue between registry and executor
//! - `JobExecutor`: drains the queue and writes terminal states
//! - `StatusReader`: point lookups by identity
//! - `JobSystem`: all of the above wired from configuration

pub mod error;
pub mod executor;
pub mod postgres;
pub mod queue;
pub mod registry;
pub mod status;
pub mod store;

use std::sync::Arc;

use tracing::info;

pub use error::JobError;
pub use executor::{
    CompletionFailurePolicy, ExecutorStats, JobExecutor, JobExecutorConfig, JobExecutorHandle,
    JobWork, SimulatedWork,
};
pub use postgres::PostgresJobStore;
pub use queue::{DispatchReceiver, DispatchSender, dispatch_queue};
pub use registry::JobRegistry;
pub use status::StatusReader;
pub use store::{InMemoryJobStore, JobRecordStore, SharedJobStore, StoreError};

use crate::config::{JobSystemConfig, JobsConfig, StoreConfig};

/// A running job system: registry and status reader in front, executor behind.
///
/// Must be started inside a tokio runtime. Dropping every clone of the
/// registry closes the queue; the executor then finishes its in-flight jobs
/// and stops.
pub struct JobSystem {
    pub registry: JobRegistry,
    pub status: StatusReader,
    pub executor: JobExecutorHandle,
}

impl JobSystem {
    /// Open the configured store and start the system on it.
    pub async fn from_config(config: &JobSystemConfig) -> Result<Self, StoreError> {
        let store: SharedJobStore = match &config.store {
            StoreConfig::InMemory => InMemoryJobStore::arc(),
            StoreConfig::Postgres { database_url } => {
                Arc::new(PostgresJobStore::connect(database_url).await?)
            }
        };
        Ok(Self::start(store, &config.jobs))
    }

    /// Start the system on an existing store.
    pub fn start(store: SharedJobStore, config: &JobsConfig) -> Self {
        Self::start_with_work(store, config, None)
    }

    /// Start the system with custom work instead of the simulated delay.
    pub fn start_with_work(
        store: SharedJobStore,
        config: &JobsConfig,
        work: Option<Arc<dyn JobWork>>,
    ) -> Self {
        let (tx, rx) = dispatch_queue(config.queue_capacity);
        let mut executor = JobExecutor::new(store.clone(), rx, config.executor_config());
        if let Some(work) = work {
            executor = executor.with_work(work);
        }

        info!(
            queue_capacity = config.queue_capacity,
            work_duration_ms = config.work_duration.as_millis() as u64,
            failure_policy = %config.failure_policy,
            "job system started"
        );

        Self {
            registry: JobRegistry::new(store.clone(), tx),
            status: StatusReader::new(store),
            executor: executor.spawn(),
        }
    }
}
