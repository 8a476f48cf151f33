//! The `Store` contract (§4.1): durable, transactional persistence with two
//! atomic primitives (`claim_next`, and the lock-checked finalizers) on which
//! every safety property in §8 hinges.

use crate::config::ConfigValue;
use crate::error::Result;
use crate::job::{EnqueueSpec, Job, ListFilter, Stats};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Registration row for a Worker process (§3.2).
#[derive(Debug, Clone)]
pub struct WorkerRegistration {
    pub worker_id: String,
    pub pid: u32,
    pub started_at: DateTime<Utc>,
    pub last_heartbeat: DateTime<Utc>,
}

/// Outcome of `Store::record_failure`: whether the job was rescheduled or
/// moved to the dead-letter partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    Rescheduled,
    Dead,
}

/// Durable, transactional persistence of jobs, config, and the worker
/// registry. Every method here is a single Store-level transaction; no
/// caller is expected to compose two calls atomically.
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert a new `pending` job, capturing `max_retries`/`backoff_base`
    /// from the current config (I5: these never change after enqueue).
    /// Fails with `DuplicateId` if `spec.id` collides with an existing row.
    async fn enqueue(&self, spec: EnqueueSpec, now: DateTime<Utc>) -> Result<String>;

    /// Atomically claim the highest-priority claimable job, ordered by
    /// `(priority DESC, run_at ASC, created_at ASC)`. A job is claimable when
    /// `state = pending`, `run_at <= now`, and its lock (if any) has expired.
    /// Returns `None` if nothing is claimable right now.
    async fn claim_next(&self, worker_id: &str, now: DateTime<Utc>) -> Result<Option<Job>>;

    /// Mark a held job `completed`, clearing the lock and storing the
    /// truncated output tails. Fails with `LostLock` if `worker_id` no
    /// longer holds the lock.
    #[allow(clippy::too_many_arguments)]
    async fn record_success(
        &self,
        id: &str,
        worker_id: &str,
        exit_code: i64,
        stdout: &[u8],
        stderr: &[u8],
        now: DateTime<Utc>,
    ) -> Result<()>;

    /// Record a failed attempt under the same lock check as
    /// `record_success`. Increments `attempts`; moves to `dead` once
    /// `attempts > max_retries`, otherwise reschedules into `pending` with
    /// backoff applied to `run_at`.
    #[allow(clippy::too_many_arguments)]
    async fn record_failure(
        &self,
        id: &str,
        worker_id: &str,
        exit_code: i64,
        stdout: &[u8],
        stderr: &[u8],
        error: &str,
        now: DateTime<Utc>,
    ) -> Result<FailureOutcome>;

    /// Renew the lease on a held job while its Executor is still running.
    async fn extend_lock(&self, id: &str, worker_id: &str, now: DateTime<Utc>) -> Result<()>;

    /// Reset every `processing` row whose lease has expired back to
    /// `pending`, preserving `attempts` (this is crash recovery, not a
    /// retry). Returns the number of rows reclaimed.
    async fn sweep_expired_locks(&self, now: DateTime<Utc>) -> Result<u64>;

    /// Revive a `dead` job to `pending` with `attempts` reset to zero and
    /// `run_at` set to `now`. Fails with `NotDead` if the job is not
    /// currently dead.
    async fn dlq_retry(&self, id: &str, now: DateTime<Utc>) -> Result<()>;

    async fn get(&self, id: &str) -> Result<Job>;
    async fn list(&self, filter: ListFilter) -> Result<Vec<Job>>;
    async fn stats(&self) -> Result<Stats>;
    async fn dlq_list(&self) -> Result<Vec<Job>>;

    // --- Config (§4.6), persisted on the same Store ---
    async fn get_config(&self, key: &str) -> Result<Option<ConfigValue>>;
    async fn set_config(&self, key: &str, value: ConfigValue) -> Result<()>;
    async fn all_config(&self) -> Result<Vec<(String, ConfigValue)>>;

    // --- Worker registry (§3.2) ---
    async fn register_worker(&self, registration: WorkerRegistration) -> Result<()>;
    async fn heartbeat_worker(&self, worker_id: &str, now: DateTime<Utc>) -> Result<()>;
    async fn list_workers(&self) -> Result<Vec<WorkerRegistration>>;
    async fn deregister_worker(&self, worker_id: &str) -> Result<()>;
}
