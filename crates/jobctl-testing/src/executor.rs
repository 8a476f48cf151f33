//! A scriptable `Executor` so Worker tests never actually spawn a shell.

use async_trait::async_trait;
use jobctl_core::executor::{ExecResult, Executor, Outcome};
use std::sync::Mutex;

/// Replays a fixed sequence of results, one per call, repeating the last
/// entry once the sequence is exhausted.
pub struct FakeExecutor {
    script: Mutex<Vec<ExecResult>>,
}

impl FakeExecutor {
    pub fn new(script: Vec<ExecResult>) -> Self {
        Self {
            script: Mutex::new(script),
        }
    }

    pub fn always_success() -> Self {
        Self::new(vec![ExecResult {
            exit_code: 0,
            stdout_tail: "ok".to_string(),
            stderr_tail: String::new(),
            outcome: Outcome::Exited,
        }])
    }

    pub fn always_fail(exit_code: i64) -> Self {
        Self::new(vec![ExecResult {
            exit_code,
            stdout_tail: String::new(),
            stderr_tail: "boom".to_string(),
            outcome: Outcome::Exited,
        }])
    }
}

#[async_trait]
impl Executor for FakeExecutor {
    async fn execute(&self, _command: &str, _timeout_s: i64) -> ExecResult {
        let mut script = self.script.lock().unwrap();
        if script.len() > 1 {
            script.remove(0)
        } else {
            script
                .first()
                .cloned()
                .unwrap_or(ExecResult {
                    exit_code: 0,
                    stdout_tail: String::new(),
                    stderr_tail: String::new(),
                    outcome: Outcome::Exited,
                })
        }
    }
}
