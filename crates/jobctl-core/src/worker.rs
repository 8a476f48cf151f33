//! The Worker loop (§4.4): claim, run, finalize, repeat. One `Worker` is one
//! OS process in production (the Supervisor spawns the process that drives
//! it); the loop itself has no opinion on that, which is what lets
//! `jobctl-testing` drive it in-process for fast tests.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;

use crate::config::{ConfigCache, ConfigKey};
use crate::error::StoreError;
use crate::executor::{Executor, Outcome};
use crate::job::Job;
use crate::store::{FailureOutcome, Store, WorkerRegistration};

/// Outcome of a single poll iteration, surfaced for tests and for the
/// worker-run binary's logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Idle,
    Completed,
    Retried,
    DeadLettered,
    LostLock,
}

pub struct Worker<S, E> {
    worker_id: String,
    store: Arc<S>,
    executor: Arc<E>,
    shutdown: watch::Receiver<bool>,
}

impl<S, E> Worker<S, E>
where
    S: Store + 'static,
    E: Executor + 'static,
{
    pub fn new(
        worker_id: impl Into<String>,
        store: Arc<S>,
        executor: Arc<E>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            worker_id: worker_id.into(),
            store,
            executor,
            shutdown,
        }
    }

    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    /// Runs until a shutdown signal is observed. Never returns an error for a
    /// per-job failure — only Store-fatal conditions would unwind out of
    /// this loop, and those are logged by the caller at the process level.
    pub async fn run(mut self) {
        let now = Utc::now();
        let registration = WorkerRegistration {
            worker_id: self.worker_id.clone(),
            pid: std::process::id(),
            started_at: now,
            last_heartbeat: now,
        };
        if let Err(e) = self.store.register_worker(registration).await {
            tracing::error!(worker_id = %self.worker_id, error = %e, "failed to register worker");
        }

        loop {
            if *self.shutdown.borrow() {
                tracing::info!(worker_id = %self.worker_id, "shutdown observed, exiting idle loop");
                break;
            }

            let cfg = self.load_config().await;
            match self.tick(&cfg).await {
                Tick::Idle => {
                    let now = Utc::now();
                    if let Err(e) = self.store.heartbeat_worker(&self.worker_id, now).await {
                        tracing::warn!(worker_id = %self.worker_id, error = %e, "heartbeat failed");
                    }
                    let poll_ms = cfg.get_int(ConfigKey::PollIntervalMs).max(1) as u64;
                    tokio::select! {
                        _ = tokio::time::sleep(Duration::from_millis(poll_ms)) => {}
                        _ = self.shutdown.changed() => {}
                    }
                }
                _ => {}
            }
        }

        let _ = self.store.deregister_worker(&self.worker_id).await;
    }

    async fn load_config(&self) -> ConfigCache {
        match self.store.all_config().await {
            Ok(entries) => ConfigCache::load(entries),
            Err(e) => {
                tracing::warn!(worker_id = %self.worker_id, error = %e, "config load failed, using defaults");
                ConfigCache::new()
            }
        }
    }

    /// One claim → run → finalize cycle. Public so `jobctl-testing` can
    /// drive exact scenarios without racing the idle sleep.
    pub async fn tick(&self, cfg: &ConfigCache) -> Tick {
        let now = Utc::now();
        let job = match self.store.claim_next(&self.worker_id, now).await {
            Ok(Some(job)) => job,
            Ok(None) => return Tick::Idle,
            Err(e) => {
                tracing::error!(worker_id = %self.worker_id, error = %e, "claim_next failed");
                return Tick::Idle;
            }
        };

        tracing::info!(worker_id = %self.worker_id, job_id = %job.id, "claimed job");
        let result = self.run_job(&job, cfg).await;
        self.finalize(&job, result).await
    }

    async fn run_job(&self, job: &Job, cfg: &ConfigCache) -> crate::executor::ExecResult {
        let effective_timeout = if job.timeout_s > 0 {
            job.timeout_s
        } else {
            cfg.get_int(ConfigKey::JobTimeoutS)
        };
        let lock_timeout_s = cfg.get_int(ConfigKey::LockTimeoutS).max(1);
        let refresh_every = Duration::from_secs((lock_timeout_s / 3).max(1) as u64);

        let exec_fut = self.executor.execute(&job.command, effective_timeout);
        tokio::pin!(exec_fut);
        let mut ticker = tokio::time::interval(refresh_every);
        ticker.tick().await; // first tick fires immediately; the claim just installed a fresh lease

        loop {
            tokio::select! {
                res = &mut exec_fut => break res,
                _ = ticker.tick() => {
                    let now = Utc::now();
                    if let Err(e) = self.store.extend_lock(&job.id, &self.worker_id, now).await {
                        tracing::warn!(worker_id = %self.worker_id, job_id = %job.id, error = %e, "lease extend failed");
                    }
                }
            }
        }
    }

    async fn finalize(&self, job: &Job, result: crate::executor::ExecResult) -> Tick {
        let now = Utc::now();
        if result.exit_code == 0 && result.outcome == Outcome::Exited {
            match self
                .store
                .record_success(
                    &job.id,
                    &self.worker_id,
                    result.exit_code,
                    result.stdout_tail.as_bytes(),
                    result.stderr_tail.as_bytes(),
                    now,
                )
                .await
            {
                Ok(()) => Tick::Completed,
                Err(StoreError::LostLock { .. }) => {
                    tracing::info!(worker_id = %self.worker_id, job_id = %job.id, "lost lock finalizing success, discarding outcome");
                    Tick::LostLock
                }
                Err(e) => {
                    tracing::error!(worker_id = %self.worker_id, job_id = %job.id, error = %e, "record_success failed");
                    Tick::Idle
                }
            }
        } else {
            let last_error = describe_failure(&result);
            match self
                .store
                .record_failure(
                    &job.id,
                    &self.worker_id,
                    result.exit_code,
                    result.stdout_tail.as_bytes(),
                    result.stderr_tail.as_bytes(),
                    &last_error,
                    now,
                )
                .await
            {
                Ok(FailureOutcome::Rescheduled) => Tick::Retried,
                Ok(FailureOutcome::Dead) => Tick::DeadLettered,
                Err(StoreError::LostLock { .. }) => {
                    tracing::info!(worker_id = %self.worker_id, job_id = %job.id, "lost lock finalizing failure, discarding outcome");
                    Tick::LostLock
                }
                Err(e) => {
                    tracing::error!(worker_id = %self.worker_id, job_id = %job.id, error = %e, "record_failure failed");
                    Tick::Idle
                }
            }
        }
    }
}

fn describe_failure(result: &crate::executor::ExecResult) -> String {
    match result.outcome {
        Outcome::Exited => format!("exit code {}", result.exit_code),
        Outcome::TimedOut => "execution timed out".to_string(),
        Outcome::LaunchFailed => format!("launch failed: {}", result.stderr_tail),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigValue;
    use crate::job::EnqueueSpec;
    use jobctl_testing::{FakeExecutor, InMemoryStore};

    fn cache_with(poll_ms: i64) -> ConfigCache {
        ConfigCache::load(vec![(
            ConfigKey::PollIntervalMs.as_str().to_string(),
            ConfigValue::Int(poll_ms),
        )])
    }

    #[tokio::test]
    async fn idle_tick_on_empty_queue() {
        let store = Arc::new(InMemoryStore::new());
        let executor = Arc::new(FakeExecutor::always_success());
        let (_tx, rx) = watch::channel(false);
        let worker = Worker::new("w1", store, executor, rx);
        let tick = worker.tick(&cache_with(10)).await;
        assert_eq!(tick, Tick::Idle);
    }

    #[tokio::test]
    async fn successful_job_completes() {
        let store = Arc::new(InMemoryStore::new());
        store
            .enqueue(EnqueueSpec::new("echo ok"), Utc::now())
            .await
            .unwrap();
        let executor = Arc::new(FakeExecutor::always_success());
        let (_tx, rx) = watch::channel(false);
        let worker = Worker::new("w1", store, executor, rx);
        let tick = worker.tick(&cache_with(10)).await;
        assert_eq!(tick, Tick::Completed);
    }

    #[tokio::test]
    async fn failing_job_retries_then_dead_letters() {
        let store = Arc::new(InMemoryStore::new());
        let mut spec = EnqueueSpec::new("exit 1");
        spec.id = Some("B".to_string());
        spec.max_retries = Some(2);
        store.enqueue(spec, Utc::now()).await.unwrap();
        let executor = Arc::new(FakeExecutor::always_fail(1));
        let (_tx, rx) = watch::channel(false);
        let worker = Worker::new("w1", store.clone(), executor, rx);

        assert_eq!(worker.tick(&cache_with(10)).await, Tick::Retried);
        assert_eq!(worker.tick(&cache_with(10)).await, Tick::Idle); // scheduled into the future, not yet ready
    }
}
