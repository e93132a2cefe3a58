//! Infrastructure layer: job record stores, dispatch, execution, configuration.

pub mod config;
pub mod jobs;

pub use config::{ConfigError, JobSystemConfig, JobsConfig, StoreConfig};
pub use jobs::{JobError, JobSystem};
