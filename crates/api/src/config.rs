//! Server configuration: listen address plus the job system settings.

use std::net::SocketAddr;

use jobhub_infra::{ConfigError, JobSystemConfig};

pub const BIND_ADDR_VAR: &str = "BIND_ADDR";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub jobs: JobSystemConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw = lookup(BIND_ADDR_VAR).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = raw.trim().parse().map_err(|e| ConfigError::Invalid {
            key: BIND_ADDR_VAR,
            value: raw.clone(),
            reason: format!("{e}"),
        })?;

        Ok(Self {
            bind_addr,
            jobs: JobSystemConfig::from_lookup(lookup)?,
        })
    }
}
