//! Job executor: drains the dispatch queue and completes each job on its own task.
//!
//! The run loop never waits on a job. Every dequeued job is spawned onto a
//! `JoinSet` owned by the loop. The loop waits on the queue and on the task set
//! together, so finished tasks are reaped even while no job arrives. The
//! remaining ones are awaited once the queue closes.
//!
//! Failures inside a job task are logged and end the task. Nothing is retried;
//! what a failure leaves behind in the store is decided by
//! [`CompletionFailurePolicy`].

use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use jobhub_core::{Job, JobStatus};

use super::error::JobError;
use super::queue::DispatchReceiver;
use super::store::SharedJobStore;

/// Default simulated work per job.
pub const DEFAULT_WORK_DURATION: Duration = Duration::from_millis(5000);

/// The work a job performs before it is marked completed.
#[async_trait]
pub trait JobWork: Send + Sync {
    async fn perform(&self, job: &Job) -> Result<(), String>;
}

/// Work that just waits for a fixed duration.
#[derive(Debug, Clone, Copy)]
pub struct SimulatedWork {
    pub duration: Duration,
}

impl SimulatedWork {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }
}

impl Default for SimulatedWork {
    fn default() -> Self {
        Self::new(DEFAULT_WORK_DURATION)
    }
}

#[async_trait]
impl JobWork for SimulatedWork {
    async fn perform(&self, _job: &Job) -> Result<(), String> {
        tokio::time::sleep(self.duration).await;
        Ok(())
    }
}

/// What a job task leaves in the store when its work or its completion write
/// fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompletionFailurePolicy {
    /// Log and leave the record `pending`.
    #[default]
    LeavePending,
    /// Make one best-effort write of `failed`.
    MarkFailed,
}

impl CompletionFailurePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompletionFailurePolicy::LeavePending => "leave_pending",
            CompletionFailurePolicy::MarkFailed => "mark_failed",
        }
    }
}

impl std::fmt::Display for CompletionFailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompletionFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "leave_pending" => Ok(CompletionFailurePolicy::LeavePending),
            "mark_failed" => Ok(CompletionFailurePolicy::MarkFailed),
            other => Err(format!(
                "unknown failure policy '{other}' (expected leave_pending or mark_failed)"
            )),
        }
    }
}

/// Job executor configuration.
#[derive(Debug, Clone)]
pub struct JobExecutorConfig {
    /// Name for logging
    pub name: String,
    /// Duration of the default simulated work
    pub work_duration: Duration,
    pub failure_policy: CompletionFailurePolicy,
}

impl Default for JobExecutorConfig {
    fn default() -> Self {
        Self {
            name: "job-executor".to_string(),
            work_duration: DEFAULT_WORK_DURATION,
            failure_policy: CompletionFailurePolicy::default(),
        }
    }
}

impl JobExecutorConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_work_duration(mut self, duration: Duration) -> Self {
        self.work_duration = duration;
        self
    }

    pub fn with_failure_policy(mut self, policy: CompletionFailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }
}

/// Executor runtime statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct ExecutorStats {
    /// Jobs taken off the queue.
    pub jobs_dispatched: u64,
    /// Jobs whose completion write succeeded.
    pub jobs_completed: u64,
    /// Jobs whose task ended without completing them.
    pub jobs_failed: u64,
    pub in_flight: usize,
}

type SharedStats = Arc<Mutex<ExecutorStats>>;

fn lock_stats(stats: &SharedStats) -> MutexGuard<'_, ExecutorStats> {
    // Counters stay usable after a poisoning panic.
    stats.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Handle to a spawned executor loop.
#[derive(Debug)]
pub struct JobExecutorHandle {
    join: JoinHandle<()>,
    stats: SharedStats,
}

impl JobExecutorHandle {
    /// Get current executor statistics.
    pub fn stats(&self) -> ExecutorStats {
        lock_stats(&self.stats).clone()
    }

    /// True once the queue has closed and every job task has ended.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the loop to end (after every sender is dropped).
    pub async fn join(self) -> ExecutorStats {
        if let Err(e) = self.join.await {
            error!(error = %e, "job executor loop aborted");
        }
        lock_stats(&self.stats).clone()
    }
}

/// How a single job task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobOutcome {
    Completed,
    MarkedFailed,
    LeftPending,
}

/// Everything a job task needs, shared by all tasks of one executor.
struct TaskContext {
    executor: String,
    store: SharedJobStore,
    work: Arc<dyn JobWork>,
    policy: CompletionFailurePolicy,
    stats: SharedStats,
}

/// Consumes the dispatch queue and completes jobs concurrently.
pub struct JobExecutor {
    name: String,
    queue: DispatchReceiver,
    store: SharedJobStore,
    work: Arc<dyn JobWork>,
    policy: CompletionFailurePolicy,
    stats: SharedStats,
}

impl JobExecutor {
    /// Create an executor running [`SimulatedWork`] for `config.work_duration`.
    pub fn new(store: SharedJobStore, queue: DispatchReceiver, config: JobExecutorConfig) -> Self {
        Self {
            name: config.name,
            queue,
            store,
            work: Arc::new(SimulatedWork::new(config.work_duration)),
            policy: config.failure_policy,
            stats: Arc::new(Mutex::new(ExecutorStats::default())),
        }
    }

    /// Replace the work every job performs.
    pub fn with_work(mut self, work: Arc<dyn JobWork>) -> Self {
        self.work = work;
        self
    }

    /// Run the loop on the tokio runtime.
    pub fn spawn(self) -> JobExecutorHandle {
        let stats = self.stats.clone();
        let join = tokio::spawn(self.run());
        JobExecutorHandle { join, stats }
    }

    /// Dequeue jobs until the queue closes, spawning one task per job.
    ///
    /// Returns after the queue has closed and every spawned task has ended.
    pub async fn run(self) {
        let ctx = Arc::new(TaskContext {
            executor: self.name,
            store: self.store,
            work: self.work,
            policy: self.policy,
            stats: self.stats,
        });
        info!(executor = %ctx.executor, policy = %ctx.policy, "job executor started");

        let mut tasks = JoinSet::new();
        loop {
            tokio::select! {
                Some(result) = tasks.join_next(), if !tasks.is_empty() => ctx.reap(result),
                next = self.queue.next() => {
                    let Some(job) = next else { break };
                    debug!(executor = %ctx.executor, job_id = %job.id, "dequeued job");
                    {
                        let mut s = lock_stats(&ctx.stats);
                        s.jobs_dispatched += 1;
                        s.in_flight += 1;
                    }

                    let task_ctx = ctx.clone();
                    tasks.spawn(async move {
                        let outcome = task_ctx.complete_job(job).await;
                        task_ctx.record(outcome);
                    });
                }
            }
        }

        info!(
            executor = %ctx.executor,
            in_flight = tasks.len(),
            "dispatch queue closed; waiting for in-flight jobs"
        );
        while let Some(result) = tasks.join_next().await {
            ctx.reap(result);
        }
        info!(executor = %ctx.executor, "job executor stopped");
    }
}

impl TaskContext {
    fn record(&self, outcome: JobOutcome) {
        let mut s = lock_stats(&self.stats);
        s.in_flight = s.in_flight.saturating_sub(1);
        match outcome {
            JobOutcome::Completed => s.jobs_completed += 1,
            JobOutcome::MarkedFailed | JobOutcome::LeftPending => s.jobs_failed += 1,
        }
    }

    fn reap(&self, result: Result<(), JoinError>) {
        if let Err(e) = result {
            error!(executor = %self.executor, error = %e, "job task panicked");
            // The task never reached `record`.
            self.record(JobOutcome::LeftPending);
        }
    }

    async fn complete_job(&self, job: Job) -> JobOutcome {
        let job_id = job.id;
        let prior = job.status;
        debug!(job_id = %job_id, status = %prior, "job started");

        if let Err(reason) = self.work.perform(&job).await {
            warn!(job_id = %job_id, error = %reason, "job work failed");
            return self.handle_failure(&job).await;
        }

        let mut completed = job.clone();
        if let Err(e) = completed.transition(JobStatus::Completed, Utc::now()) {
            warn!(job_id = %job_id, error = %e, "job cannot be completed");
            return JobOutcome::LeftPending;
        }

        match self
            .store
            .update_status_by_id(job_id, completed.status, completed.updated_at)
            .await
        {
            Ok(0) => {
                let err = JobError::UpdateRace(job_id);
                warn!(job_id = %job_id, error = %err, kind = err.kind(), "job completion lost");
                return JobOutcome::LeftPending;
            }
            Ok(_) => {}
            Err(e) => {
                let err = JobError::StoreWrite(e);
                error!(job_id = %job_id, error = %err, "failed to record job completion");
                return self.handle_failure(&job).await;
            }
        }

        match self.store.select_by_id(job_id).await {
            Ok(Some(updated)) => {
                info!(job_id = %job_id, from = %prior, to = %updated.status, "job status updated");
            }
            Ok(None) => {
                warn!(job_id = %job_id, "job disappeared after completion");
            }
            Err(e) => {
                let err = JobError::StoreRead(e);
                warn!(job_id = %job_id, error = %err, "failed to re-read completed job");
            }
        }
        JobOutcome::Completed
    }

    async fn handle_failure(&self, job: &Job) -> JobOutcome {
        match self.policy {
            CompletionFailurePolicy::LeavePending => {
                warn!(job_id = %job.id, "job left pending");
                JobOutcome::LeftPending
            }
            CompletionFailurePolicy::MarkFailed => {
                let updated_at = job.transition_timestamp(Utc::now());
                match self
                    .store
                    .update_status_by_id(job.id, JobStatus::Failed, updated_at)
                    .await
                {
                    Ok(0) => {
                        let err = JobError::UpdateRace(job.id);
                        warn!(job_id = %job.id, error = %err, "could not mark job failed");
                        JobOutcome::LeftPending
                    }
                    Ok(_) => {
                        info!(
                            job_id = %job.id,
                            from = %job.status,
                            to = JobStatus::Failed.as_str(),
                            "job status updated"
                        );
                        JobOutcome::MarkedFailed
                    }
                    Err(e) => {
                        error!(job_id = %job.id, error = %e, "failed to mark job failed; job left pending");
                        JobOutcome::LeftPending
                    }
                }
            }
        }
    }
}
