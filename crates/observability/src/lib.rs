//! Tracing and logging setup shared by jobhub binaries and tests.

/// Initialize process-wide tracing/logging from the environment.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init(tracing::LogFormat::from_env());
}

/// Tracing configuration (filters, output format).
pub mod tracing;
