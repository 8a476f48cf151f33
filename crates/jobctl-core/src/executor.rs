//! The Executor contract (§6.1) and the one real implementation the core
//! ships: a shell-command executor. Subprocess execution is explicitly out
//! of scope as a design concern (§1), but the Worker needs something to
//! call, so this is kept deliberately small.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::Command;

use crate::job::truncate_tail;

/// How the Executor's attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Exited,
    TimedOut,
    LaunchFailed,
}

/// Result of one execution attempt, already tail-truncated to
/// [`crate::job::OUTPUT_TAIL_LIMIT`] bytes.
#[derive(Debug, Clone)]
pub struct ExecResult {
    pub exit_code: i64,
    pub stdout_tail: String,
    pub stderr_tail: String,
    pub outcome: Outcome,
}

/// Runs an opaque command string and reports how it ended. Implementations
/// must kill the spawned process tree on timeout (§6.1).
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, command: &str, timeout_s: i64) -> ExecResult;
}

/// Shells out via `/bin/sh -c <command>`, the natural reading of "opaque
/// command string" in §6.1.
#[derive(Debug, Default)]
pub struct ShellExecutor;

#[async_trait]
impl Executor for ShellExecutor {
    async fn execute(&self, command: &str, timeout_s: i64) -> ExecResult {
        let mut cmd = Command::new("/bin/sh");
        cmd.arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // Put the child in its own process group so a timeout kill takes any
        // descendants with it instead of leaking them.
        #[cfg(unix)]
        unsafe {
            use std::os::unix::process::CommandExt;
            cmd.pre_exec(|| {
                nix::unistd::setsid().map_err(std::io::Error::other)?;
                Ok(())
            });
        }

        let mut child = match cmd.spawn() {
            Ok(c) => c,
            Err(e) => {
                return ExecResult {
                    exit_code: -1,
                    stdout_tail: String::new(),
                    stderr_tail: truncate_tail(e.to_string().as_bytes()),
                    outcome: Outcome::LaunchFailed,
                }
            }
        };

        let mut stdout = child.stdout.take();
        let mut stderr = child.stderr.take();

        let run = async {
            let mut out_buf = Vec::new();
            let mut err_buf = Vec::new();
            if let Some(mut s) = stdout.take() {
                let _ = s.read_to_end(&mut out_buf).await;
            }
            if let Some(mut s) = stderr.take() {
                let _ = s.read_to_end(&mut err_buf).await;
            }
            let status = child.wait().await;
            (status, out_buf, err_buf)
        };

        let timed = if timeout_s > 0 {
            tokio::time::timeout(Duration::from_secs(timeout_s as u64), run).await
        } else {
            Ok(run.await)
        };

        match timed {
            Ok((Ok(status), out_buf, err_buf)) => ExecResult {
                exit_code: status.code().unwrap_or(-1) as i64,
                stdout_tail: truncate_tail(&out_buf),
                stderr_tail: truncate_tail(&err_buf),
                outcome: Outcome::Exited,
            },
            Ok((Err(e), out_buf, err_buf)) => ExecResult {
                exit_code: -1,
                stdout_tail: truncate_tail(&out_buf),
                stderr_tail: truncate_tail(format!("wait failed: {e}").as_bytes()),
                outcome: Outcome::LaunchFailed,
            },
            Err(_elapsed) => {
                kill_process_group(&child);
                let _ = child.kill().await;
                ExecResult {
                    exit_code: -1,
                    stdout_tail: String::new(),
                    stderr_tail: format!("timed out after {timeout_s}s"),
                    outcome: Outcome::TimedOut,
                }
            }
        }
    }
}

#[cfg(unix)]
fn kill_process_group(child: &tokio::process::Child) {
    if let Some(pid) = child.id() {
        let pgid = nix::unistd::Pid::from_raw(pid as i32);
        let _ = nix::sys::signal::killpg(pgid, nix::sys::signal::Signal::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_process_group(_child: &tokio::process::Child) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn successful_command_reports_exit_code_and_stdout() {
        let exec = ShellExecutor;
        let r = exec.execute("echo ok", 0).await;
        assert_eq!(r.exit_code, 0);
        assert_eq!(r.outcome, Outcome::Exited);
        assert!(r.stdout_tail.contains("ok"));
    }

    #[tokio::test]
    async fn failing_command_reports_nonzero_exit() {
        let exec = ShellExecutor;
        let r = exec.execute("exit 7", 0).await;
        assert_eq!(r.exit_code, 7);
        assert_eq!(r.outcome, Outcome::Exited);
    }

    #[tokio::test]
    async fn slow_command_times_out() {
        let exec = ShellExecutor;
        let r = exec.execute("sleep 5", 1).await;
        assert_eq!(r.outcome, Outcome::TimedOut);
    }
}
