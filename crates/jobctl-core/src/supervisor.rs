//! The Supervisor (§4.5): lifecycle of N Worker *processes*. Workers are
//! separate OS processes, not threads, so that a crashing Executor cannot
//! corrupt a sibling Worker and so lock recovery can rely on crashes being
//! externally observable through missed heartbeats and expired leases (§4.5).

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use thiserror::Error;

use crate::store::Store;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("a worker pool is already running (pid file {0:?})")]
    AlreadyRunning(PathBuf),
    #[error("no worker pool is currently running")]
    NotRunning,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// One entry in the pid-map file: a worker's stable id and its OS pid.
#[derive(Debug, Clone)]
pub struct SpawnedWorker {
    pub worker_id: String,
    pub pid: u32,
}

/// How to construct the child process for one Worker. `jobctl-cli` fills
/// this in with `std::env::current_exe()` and the `worker-run` subcommand.
#[derive(Debug, Clone)]
pub struct WorkerProcessSpec {
    pub exe_path: PathBuf,
    pub args_template: Vec<String>,
}

/// Spawns, tracks, and reaps a pool of Worker processes via a pid-map file
/// (§6.4). Holds no async Store handle of its own for the spawn/signal path
/// — those are plain OS operations — but `stop` takes a `Store` reference to
/// clean up registry rows for processes that had to be force-killed.
pub struct Supervisor {
    pid_map_path: PathBuf,
}

impl Supervisor {
    pub fn new(pid_map_path: impl Into<PathBuf>) -> Self {
        Self {
            pid_map_path: pid_map_path.into(),
        }
    }

    /// True if the pid-map file names at least one process that is still alive.
    pub fn is_running(&self) -> bool {
        self.read_pid_map()
            .map(|entries| entries.iter().any(|e| process_alive(e.pid)))
            .unwrap_or(false)
    }

    /// Spawn `count` fresh Worker processes and record them in the pid-map
    /// file. Fails with `AlreadyRunning` if the pid-map names any live
    /// process already.
    pub fn start(
        &self,
        count: u32,
        hostname: &str,
        spec: &WorkerProcessSpec,
    ) -> Result<Vec<SpawnedWorker>, SupervisorError> {
        if self.is_running() {
            return Err(SupervisorError::AlreadyRunning(self.pid_map_path.clone()));
        }

        let mut spawned = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let nonce = fastrand::u64(..);
            let mut cmd = Command::new(&spec.exe_path);
            cmd.args(&spec.args_template)
                .arg("--worker-nonce")
                .arg(nonce.to_string())
                .stdin(Stdio::null());
            let child = cmd.spawn()?;
            let pid = child.id();
            // The worker's stable id mirrors the glossary's
            // "hostname#pid#nonce" scheme; the child computes the same
            // string internally using its own pid and the nonce we gave it.
            let worker_id = format!("{hostname}#{pid}#{nonce}");
            spawned.push(SpawnedWorker { worker_id, pid });
            // `std::process::Child` does not kill its child on drop, so
            // dropping the handle here simply detaches from the long-running
            // daemon without terminating it.
            drop(child);
        }

        self.write_pid_map(&spawned)?;
        Ok(spawned)
    }

    /// Signal every recorded Worker to finish-and-exit, wait up to `grace`,
    /// then escalate to SIGKILL for stragglers. Deregisters any Worker that
    /// had to be force-killed, since it never got the chance to deregister
    /// itself.
    pub async fn stop(&self, store: &dyn Store, grace: Duration) -> Result<usize, SupervisorError> {
        let entries = self.read_pid_map()?;
        if entries.is_empty() {
            return Err(SupervisorError::NotRunning);
        }

        for e in &entries {
            send_signal(e.pid, Signal::Term);
        }

        let deadline = std::time::Instant::now() + grace;
        let mut remaining: Vec<&SpawnedWorker> = entries.iter().collect();
        while std::time::Instant::now() < deadline {
            remaining.retain(|e| process_alive(e.pid));
            if remaining.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        for e in &remaining {
            send_signal(e.pid, Signal::Kill);
            tracing::warn!(worker_id = %e.worker_id, pid = e.pid, "force-killed unresponsive worker");
            if let Err(err) = store.deregister_worker(&e.worker_id).await {
                tracing::warn!(worker_id = %e.worker_id, error = %err, "failed to deregister force-killed worker");
            }
        }

        let _ = std::fs::remove_file(&self.pid_map_path);
        Ok(entries.len())
    }

    fn read_pid_map(&self) -> std::io::Result<Vec<SpawnedWorker>> {
        let content = match std::fs::read_to_string(&self.pid_map_path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        Ok(content
            .lines()
            .filter_map(|line| {
                let (worker_id, pid) = line.split_once('\t')?;
                let pid: u32 = pid.trim().parse().ok()?;
                Some(SpawnedWorker {
                    worker_id: worker_id.to_string(),
                    pid,
                })
            })
            .collect())
    }

    /// Write-then-rename so a reader never observes a partially-written
    /// pid-map file (§5 "Shared-resource policy").
    fn write_pid_map(&self, entries: &[SpawnedWorker]) -> std::io::Result<()> {
        let tmp_path = tmp_path_for(&self.pid_map_path);
        {
            let mut f = std::fs::File::create(&tmp_path)?;
            for e in entries {
                writeln!(f, "{}\t{}", e.worker_id, e.pid)?;
            }
            f.sync_all()?;
        }
        std::fs::rename(&tmp_path, &self.pid_map_path)
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut s = path.as_os_str().to_owned();
    s.push(".tmp");
    PathBuf::from(s)
}

enum Signal {
    Term,
    Kill,
}

#[cfg(unix)]
fn send_signal(pid: u32, signal: Signal) {
    let pid = nix::unistd::Pid::from_raw(pid as i32);
    let sig = match signal {
        Signal::Term => nix::sys::signal::Signal::SIGTERM,
        Signal::Kill => nix::sys::signal::Signal::SIGKILL,
    };
    let _ = nix::sys::signal::kill(pid, sig);
}

#[cfg(not(unix))]
fn send_signal(_pid: u32, _signal: Signal) {}

#[cfg(unix)]
fn process_alive(pid: u32) -> bool {
    nix::sys::signal::kill(nix::unistd::Pid::from_raw(pid as i32), None).is_ok()
}

#[cfg(not(unix))]
fn process_alive(_pid: u32) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pid_map_round_trips_through_write_and_read() {
        let dir = std::env::temp_dir().join(format!("jobctl-pidmap-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("workers.pid");
        let sup = Supervisor::new(&path);

        let entries = vec![
            SpawnedWorker {
                worker_id: "host#1#aaa".to_string(),
                pid: 1,
            },
            SpawnedWorker {
                worker_id: "host#2#bbb".to_string(),
                pid: 2,
            },
        ];
        sup.write_pid_map(&entries).unwrap();
        let read = sup.read_pid_map().unwrap();
        assert_eq!(read.len(), 2);
        assert_eq!(read[0].worker_id, "host#1#aaa");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_pid_map_is_not_running() {
        let sup = Supervisor::new("/nonexistent/path/that/should/not/exist.pid");
        assert!(!sup.is_running());
    }
}
