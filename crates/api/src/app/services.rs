use jobhub_infra::jobs::{ExecutorStats, JobRegistry, StatusReader, StoreError};
use jobhub_infra::{JobSystem, JobSystemConfig};

/// Handles the HTTP layer calls into.
pub struct AppServices {
    pub registry: JobRegistry,
    pub status: StatusReader,
    system: JobSystem,
}

impl AppServices {
    pub fn new(system: JobSystem) -> Self {
        Self {
            registry: system.registry.clone(),
            status: system.status.clone(),
            system,
        }
    }

    pub fn executor_stats(&self) -> ExecutorStats {
        self.system.executor.stats()
    }
}

/// Open the configured store and start the job system.
pub async fn build_services(config: &JobSystemConfig) -> Result<AppServices, StoreError> {
    let system = JobSystem::from_config(config).await?;
    Ok(AppServices::new(system))
}
