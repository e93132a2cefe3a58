//! `jobhub-core`: domain building blocks for the job lifecycle.
//!
//! This crate contains **pure domain** types (no storage or runtime concerns).

pub mod error;
pub mod id;
pub mod job;

pub use error::{DomainError, DomainResult};
pub use id::JobId;
pub use job::{Job, JobStatus};
