//! In-memory `Store` used by `jobctl-core`'s own unit tests and by
//! `jobctl-cli` for dry-run / doc-test style exercises. Implements the exact
//! same atomicity contract as `jobctl-sqlite::SqliteStore` — a single
//! `std::sync::Mutex` stands in for the database's transaction isolation,
//! since every critical section here is synchronous and short.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use jobctl_core::config::{ConfigCache, ConfigKey, ConfigValue};
use jobctl_core::job::{truncate_tail, EnqueueSpec, Job, JobState, ListFilter, Stats};
use jobctl_core::retry::{next_delay_secs, FastrandJitter};
use jobctl_core::store::{FailureOutcome, Store, WorkerRegistration};
use jobctl_core::{Result, StoreError};

#[derive(Default)]
struct Inner {
    jobs: HashMap<String, Job>,
    config: HashMap<String, ConfigValue>,
    workers: HashMap<String, WorkerRegistration>,
    next_id: u64,
}

/// In-memory job store. Cheap to construct, `Send + Sync`, safe to share
/// behind an `Arc` across Worker tasks in-process (the real Store is shared
/// across Worker *processes* instead, via the database file).
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    fn cfg_cache(inner: &Inner) -> ConfigCache {
        ConfigCache::load(
            inner
                .config
                .iter()
                .map(|(k, v)| (k.clone(), *v))
                .collect(),
        )
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn enqueue(&self, spec: EnqueueSpec, now: DateTime<Utc>) -> Result<String> {
        let mut inner = self.inner.lock().unwrap();
        let id = match &spec.id {
            Some(id) => id.clone(),
            None => {
                inner.next_id += 1;
                format!("job-{}", inner.next_id)
            }
        };
        if inner.jobs.contains_key(&id) {
            return Err(StoreError::DuplicateId(id));
        }

        let cfg = Self::cfg_cache(&inner);
        let max_retries = spec
            .max_retries
            .unwrap_or_else(|| cfg.get_int(ConfigKey::MaxRetries));
        let backoff_base = spec
            .backoff_base
            .unwrap_or_else(|| cfg.get_float(ConfigKey::BackoffBase));

        let job = Job {
            id: id.clone(),
            command: spec.command,
            priority: spec.priority,
            run_at: spec.run_at.unwrap_or(now),
            state: JobState::Pending,
            attempts: 0,
            max_retries,
            backoff_base,
            timeout_s: spec.timeout_s,
            locked_by: None,
            lock_expires_at: None,
            last_error: None,
            stdout_tail: None,
            stderr_tail: None,
            exit_code: None,
            created_at: now,
            updated_at: now,
            started_at: None,
            finished_at: None,
        };
        inner.jobs.insert(id.clone(), job);
        Ok(id)
    }

    async fn claim_next(&self, worker_id: &str, now: DateTime<Utc>) -> Result<Option<Job>> {
        let mut inner = self.inner.lock().unwrap();
        let cfg = Self::cfg_cache(&inner);
        let lock_timeout_s = cfg.get_int(ConfigKey::LockTimeoutS);

        let candidate_id = inner
            .jobs
            .values()
            .filter(|j| {
                j.state == JobState::Pending
                    && j.run_at <= now
                    && j.lock_expires_at.map(|exp| exp <= now).unwrap_or(true)
            })
            .min_by(|a, b| {
                b.priority
                    .cmp(&a.priority)
                    .then(a.run_at.cmp(&b.run_at))
                    .then(a.created_at.cmp(&b.created_at))
            })
            .map(|j| j.id.clone());

        let Some(id) = candidate_id else {
            return Ok(None);
        };

        let job = inner.jobs.get_mut(&id).unwrap();
        job.state = JobState::Processing;
        job.locked_by = Some(worker_id.to_string());
        job.lock_expires_at = Some(now + ChronoDuration::seconds(lock_timeout_s));
        job.started_at = Some(now);
        job.updated_at = now;
        Ok(Some(job.clone()))
    }

    async fn record_success(
        &self,
        id: &str,
        worker_id: &str,
        exit_code: i64,
        stdout: &[u8],
        stderr: &[u8],
        now: DateTime<Utc>,
    ) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let job = inner
            .jobs
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        check_lock(job, worker_id)?;

        job.state = JobState::Completed;
        job.locked_by = None;
        job.lock_expires_at = None;
        job.exit_code = Some(exit_code);
        job.stdout_tail = Some(truncate_tail(stdout));
        job.stderr_tail = Some(truncate_tail(stderr));
        job.finished_at = Some(now);
        job.updated_at = now;
        Ok(())
    }

    async fn record_failure(
        &self,
        id: &str,
        worker_id: &str,
        exit_code: i64,
        stdout: &[u8],
        stderr: &[u8],
        error: &str,
        now: DateTime<Utc>,
    ) -> Result<FailureOutcome> {
        let mut inner = self.inner.lock().unwrap();
        let cfg = Self::cfg_cache(&inner);
        let max_backoff_s = cfg.get_int(ConfigKey::MaxBackoffS) as f64;

        let job = inner
            .jobs
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        check_lock(job, worker_id)?;

        job.attempts += 1;
        job.exit_code = Some(exit_code);
        job.stdout_tail = Some(truncate_tail(stdout));
        job.stderr_tail = Some(truncate_tail(stderr));
        job.last_error = Some(error.to_string());
        job.locked_by = None;
        job.lock_expires_at = None;
        job.updated_at = now;

        if job.attempts > job.max_retries {
            job.state = JobState::Dead;
            job.finished_at = Some(now);
            Ok(FailureOutcome::Dead)
        } else {
            let attempt_index = (job.attempts - 1) as u32;
            let mut jitter = FastrandJitter;
            let delay =
                next_delay_secs(attempt_index, job.backoff_base, max_backoff_s, &mut jitter);
            job.state = JobState::Pending;
            job.run_at = now + ChronoDuration::milliseconds((delay * 1000.0) as i64);
            Ok(FailureOutcome::Rescheduled)
        }
    }

    async fn extend_lock(&self, id: &str, worker_id: &str, now: DateTime<Utc>) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let cfg = Self::cfg_cache(&inner);
        let lock_timeout_s = cfg.get_int(ConfigKey::LockTimeoutS);

        let job = inner
            .jobs
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        check_lock(job, worker_id)?;
        job.lock_expires_at = Some(now + ChronoDuration::seconds(lock_timeout_s));
        job.updated_at = now;
        Ok(())
    }

    async fn sweep_expired_locks(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut inner = self.inner.lock().unwrap();
        let mut count = 0u64;
        for job in inner.jobs.values_mut() {
            if job.state == JobState::Processing
                && job.lock_expires_at.map(|e| e <= now).unwrap_or(false)
            {
                job.state = JobState::Pending;
                job.locked_by = None;
                job.lock_expires_at = None;
                job.updated_at = now;
                count += 1;
            }
        }
        Ok(count)
    }

    async fn dlq_retry(&self, id: &str, now: DateTime<Utc>) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let job = inner
            .jobs
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if job.state != JobState::Dead {
            return Err(StoreError::NotDead(id.to_string()));
        }
        job.state = JobState::Pending;
        job.attempts = 0;
        job.run_at = now;
        job.updated_at = now;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Job> {
        let inner = self.inner.lock().unwrap();
        inner
            .jobs
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn list(&self, filter: ListFilter) -> Result<Vec<Job>> {
        let inner = self.inner.lock().unwrap();
        let now = Utc::now();
        Ok(inner
            .jobs
            .values()
            .filter(|j| filter.state.map(|s| s == j.state).unwrap_or(true))
            .filter(|j| {
                !filter.pending_ready_only || (j.state == JobState::Pending && j.run_at <= now)
            })
            .cloned()
            .collect())
    }

    async fn stats(&self) -> Result<Stats> {
        let inner = self.inner.lock().unwrap();
        let mut stats = Stats::default();
        for job in inner.jobs.values() {
            match job.state {
                JobState::Pending => stats.pending += 1,
                JobState::Processing => stats.processing += 1,
                JobState::Completed => stats.completed += 1,
                JobState::Dead => stats.dead += 1,
            }
        }
        Ok(stats)
    }

    async fn dlq_list(&self) -> Result<Vec<Job>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .jobs
            .values()
            .filter(|j| j.state == JobState::Dead)
            .cloned()
            .collect())
    }

    async fn get_config(&self, key: &str) -> Result<Option<ConfigValue>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.config.get(key).copied())
    }

    async fn set_config(&self, key: &str, value: ConfigValue) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.config.insert(key.to_string(), value);
        Ok(())
    }

    async fn all_config(&self) -> Result<Vec<(String, ConfigValue)>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .config
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect())
    }

    async fn register_worker(&self, registration: WorkerRegistration) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .workers
            .insert(registration.worker_id.clone(), registration);
        Ok(())
    }

    async fn heartbeat_worker(&self, worker_id: &str, now: DateTime<Utc>) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(w) = inner.workers.get_mut(worker_id) {
            w.last_heartbeat = now;
        }
        Ok(())
    }

    async fn list_workers(&self) -> Result<Vec<WorkerRegistration>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.workers.values().cloned().collect())
    }

    async fn deregister_worker(&self, worker_id: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.workers.remove(worker_id);
        Ok(())
    }
}

fn check_lock(job: &Job, worker_id: &str) -> Result<()> {
    match &job.locked_by {
        Some(holder) if holder == worker_id => Ok(()),
        _ => Err(StoreError::LostLock {
            job_id: job.id.clone(),
            worker_id: worker_id.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn enqueue_round_trip_reports_pending_and_zero_attempts() {
        let store = InMemoryStore::new();
        let mut spec = EnqueueSpec::new("echo hi");
        spec.id = Some("A".to_string());
        store.enqueue(spec, Utc::now()).await.unwrap();

        let job = store.get("A").await.unwrap();
        assert_eq!(job.state, JobState::Pending);
        assert_eq!(job.attempts, 0);
        assert_eq!(job.command, "echo hi");
    }

    #[tokio::test]
    async fn duplicate_id_is_rejected() {
        let store = InMemoryStore::new();
        let mut spec = EnqueueSpec::new("echo hi");
        spec.id = Some("A".to_string());
        store.enqueue(spec.clone(), Utc::now()).await.unwrap();
        let err = store.enqueue(spec, Utc::now()).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateId(id) if id == "A"));
    }

    #[tokio::test]
    async fn claim_next_respects_priority_then_run_at_then_created_at() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        for (id, priority) in [("low", 1), ("high", 100), ("mid", 10)] {
            let mut spec = EnqueueSpec::new("true");
            spec.id = Some(id.to_string());
            spec.priority = priority;
            store.enqueue(spec, now).await.unwrap();
        }

        let first = store.claim_next("w1", now).await.unwrap().unwrap();
        assert_eq!(first.id, "high");
        let second = store.claim_next("w1", now).await.unwrap().unwrap();
        assert_eq!(second.id, "mid");
        let third = store.claim_next("w1", now).await.unwrap().unwrap();
        assert_eq!(third.id, "low");
    }

    #[tokio::test]
    async fn scheduled_job_is_not_claimable_until_run_at() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let mut spec = EnqueueSpec::new("true");
        spec.id = Some("future".to_string());
        spec.run_at = Some(now + ChronoDuration::seconds(5));
        store.enqueue(spec, now).await.unwrap();

        assert!(store.claim_next("w1", now).await.unwrap().is_none());
        let later = now + ChronoDuration::seconds(6);
        assert!(store.claim_next("w1", later).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn record_failure_dead_letters_after_max_retries() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let mut spec = EnqueueSpec::new("exit 1");
        spec.id = Some("B".to_string());
        spec.max_retries = Some(2);
        store.enqueue(spec, now).await.unwrap();

        for _ in 0..2 {
            let job = store.claim_next("w1", now).await.unwrap().unwrap();
            let outcome = store
                .record_failure(&job.id, "w1", 1, b"", b"", "boom", now)
                .await
                .unwrap();
            assert_eq!(outcome, FailureOutcome::Rescheduled);
        }

        // Third attempt exhausts retries (max_retries=2 => 3 total attempts).
        let far_future = now + ChronoDuration::hours(1);
        let job = store.claim_next("w1", far_future).await.unwrap().unwrap();
        let outcome = store
            .record_failure(&job.id, "w1", 1, b"", b"", "boom", far_future)
            .await
            .unwrap();
        assert_eq!(outcome, FailureOutcome::Dead);

        let job = store.get("B").await.unwrap();
        assert_eq!(job.state, JobState::Dead);
        assert_eq!(job.attempts, 3);
        assert!(store.dlq_list().await.unwrap().iter().any(|j| j.id == "B"));
    }

    #[tokio::test]
    async fn lost_lock_is_reported_when_another_worker_holds_it() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let mut spec = EnqueueSpec::new("true");
        spec.id = Some("C".to_string());
        store.enqueue(spec, now).await.unwrap();
        store.claim_next("w1", now).await.unwrap();

        let err = store
            .record_success("C", "w2", 0, b"", b"", now)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::LostLock { .. }));
    }

    #[tokio::test]
    async fn sweep_reclaims_expired_locks() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        store
            .set_config("lock_timeout_s", ConfigValue::Int(10))
            .await
            .unwrap();
        let mut spec = EnqueueSpec::new("true");
        spec.id = Some("D".to_string());
        store.enqueue(spec, now).await.unwrap();
        store.claim_next("w1", now).await.unwrap();

        let expired = now + ChronoDuration::seconds(11);
        let reclaimed = store.sweep_expired_locks(expired).await.unwrap();
        assert_eq!(reclaimed, 1);

        let job = store.get("D").await.unwrap();
        assert_eq!(job.state, JobState::Pending);
        assert!(job.locked_by.is_none());

        let claimed = store.claim_next("w2", expired).await.unwrap();
        assert_eq!(claimed.unwrap().id, "D");
    }

    #[tokio::test]
    async fn dlq_retry_is_idempotent_only_once() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let mut spec = EnqueueSpec::new("exit 1");
        spec.id = Some("E".to_string());
        spec.max_retries = Some(0);
        store.enqueue(spec, now).await.unwrap();
        let job = store.claim_next("w1", now).await.unwrap().unwrap();
        store
            .record_failure(&job.id, "w1", 1, b"", b"", "boom", now)
            .await
            .unwrap();
        assert_eq!(store.get("E").await.unwrap().state, JobState::Dead);

        store.dlq_retry("E", now).await.unwrap();
        let job = store.get("E").await.unwrap();
        assert_eq!(job.state, JobState::Pending);
        assert_eq!(job.attempts, 0);

        let err = store.dlq_retry("E", now).await.unwrap_err();
        assert!(matches!(err, StoreError::NotDead(id) if id == "E"));
    }
}
