//! Configuration loading from environment variables.
//!
//! | variable | default |
//! |---|---|
//! | `JOBS_QUEUE_CAPACITY` | `5` |
//! | `JOBS_WORK_DURATION_MS` | `5000` |
//! | `JOBS_FAILURE_POLICY` | `leave_pending` |
//! | `USE_PERSISTENT_STORES` | `false` |
//! | `DATABASE_URL` | required when persistent |
//!
//! Everything is read through a lookup function so tests can supply values
//! without touching the process environment.

use std::time::Duration;

use crate::jobs::executor::{CompletionFailurePolicy, DEFAULT_WORK_DURATION, JobExecutorConfig};
use crate::jobs::queue::DEFAULT_QUEUE_CAPACITY;

pub const QUEUE_CAPACITY_VAR: &str = "JOBS_QUEUE_CAPACITY";
pub const WORK_DURATION_VAR: &str = "JOBS_WORK_DURATION_MS";
pub const FAILURE_POLICY_VAR: &str = "JOBS_FAILURE_POLICY";
pub const USE_PERSISTENT_STORES_VAR: &str = "USE_PERSISTENT_STORES";
pub const DATABASE_URL_VAR: &str = "DATABASE_URL";

/// Invalid or missing configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} must be set{reason}")]
    Missing { key: &'static str, reason: &'static str },

    #[error("invalid value '{value}' for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Tuning of the job lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobsConfig {
    pub queue_capacity: usize,
    pub work_duration: Duration,
    pub failure_policy: CompletionFailurePolicy,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            work_duration: DEFAULT_WORK_DURATION,
            failure_policy: CompletionFailurePolicy::default(),
        }
    }
}

impl JobsConfig {
    pub fn executor_config(&self) -> JobExecutorConfig {
        JobExecutorConfig::default()
            .with_work_duration(self.work_duration)
            .with_failure_policy(self.failure_policy)
    }
}

/// Which record store backs the job system.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StoreConfig {
    #[default]
    InMemory,
    Postgres { database_url: String },
}

/// Everything needed to assemble the job system.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JobSystemConfig {
    pub jobs: JobsConfig,
    pub store: StoreConfig,
}

impl JobSystemConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`; unset keys take their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = JobsConfig::default();

        let queue_capacity = match lookup(QUEUE_CAPACITY_VAR) {
            None => defaults.queue_capacity,
            Some(raw) => {
                let capacity: usize = raw.trim().parse().map_err(|e| ConfigError::Invalid {
                    key: QUEUE_CAPACITY_VAR,
                    value: raw.clone(),
                    reason: format!("{e}"),
                })?;
                if capacity == 0 {
                    return Err(ConfigError::Invalid {
                        key: QUEUE_CAPACITY_VAR,
                        value: raw,
                        reason: "capacity must be at least 1".to_string(),
                    });
                }
                capacity
            }
        };

        let work_duration = match lookup(WORK_DURATION_VAR) {
            None => defaults.work_duration,
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|e| ConfigError::Invalid {
                    key: WORK_DURATION_VAR,
                    value: raw.clone(),
                    reason: format!("{e}"),
                })?,
        };

        let failure_policy = match lookup(FAILURE_POLICY_VAR) {
            None => defaults.failure_policy,
            Some(raw) => raw.parse().map_err(|reason| ConfigError::Invalid {
                key: FAILURE_POLICY_VAR,
                value: raw.clone(),
                reason,
            })?,
        };

        let persistent = lookup(USE_PERSISTENT_STORES_VAR)
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        let store = if persistent {
            let database_url = lookup(DATABASE_URL_VAR)
                .filter(|url| !url.trim().is_empty())
                .ok_or(ConfigError::Missing {
                    key: DATABASE_URL_VAR,
                    reason: " when USE_PERSISTENT_STORES=true",
                })?;
            StoreConfig::Postgres { database_url }
        } else {
            StoreConfig::InMemory
        };

        Ok(Self {
            jobs: JobsConfig {
                queue_capacity,
                work_duration,
                failure_policy,
            },
            store,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = JobSystemConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.jobs.queue_capacity, 5);
        assert_eq!(config.jobs.work_duration, Duration::from_secs(5));
        assert_eq!(config.jobs.failure_policy, CompletionFailurePolicy::LeavePending);
        assert_eq!(config.store, StoreConfig::InMemory);
    }

    #[test]
    fn reads_every_variable() {
        let config = JobSystemConfig::from_lookup(lookup_from(&[
            (QUEUE_CAPACITY_VAR, "12"),
            (WORK_DURATION_VAR, "250"),
            (FAILURE_POLICY_VAR, "mark_failed"),
            (USE_PERSISTENT_STORES_VAR, "true"),
            (DATABASE_URL_VAR, "postgres://localhost/jobs"),
        ]))
        .unwrap();

        assert_eq!(config.jobs.queue_capacity, 12);
        assert_eq!(config.jobs.work_duration, Duration::from_millis(250));
        assert_eq!(config.jobs.failure_policy, CompletionFailurePolicy::MarkFailed);
        assert_eq!(
            config.store,
            StoreConfig::Postgres {
                database_url: "postgres://localhost/jobs".to_string()
            }
        );
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let err = JobSystemConfig::from_lookup(lookup_from(&[(QUEUE_CAPACITY_VAR, "0")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: QUEUE_CAPACITY_VAR, .. }));
    }

    #[test]
    fn non_numeric_values_are_rejected() {
        let err = JobSystemConfig::from_lookup(lookup_from(&[(WORK_DURATION_VAR, "5s")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: WORK_DURATION_VAR, .. }));

        let err = JobSystemConfig::from_lookup(lookup_from(&[(QUEUE_CAPACITY_VAR, "-1")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: QUEUE_CAPACITY_VAR, .. }));
    }

    #[test]
    fn unknown_failure_policy_is_rejected() {
        let err = JobSystemConfig::from_lookup(lookup_from(&[(FAILURE_POLICY_VAR, "retry")]))
            .unwrap_err();
        assert!(err.to_string().contains("retry"));
    }

    #[test]
    fn persistent_store_requires_database_url() {
        let err =
            JobSystemConfig::from_lookup(lookup_from(&[(USE_PERSISTENT_STORES_VAR, "true")]))
                .unwrap_err();
        assert_eq!(
            err.to_string(),
            "DATABASE_URL must be set when USE_PERSISTENT_STORES=true"
        );
    }

    #[test]
    fn executor_config_carries_job_settings() {
        let jobs = JobsConfig {
            queue_capacity: 3,
            work_duration: Duration::from_millis(10),
            failure_policy: CompletionFailurePolicy::MarkFailed,
        };
        let exec = jobs.executor_config();
        assert_eq!(exec.work_duration, Duration::from_millis(10));
        assert_eq!(exec.failure_policy, CompletionFailurePolicy::MarkFailed);
    }
}
