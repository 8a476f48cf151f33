//! Job domain types: the persisted row shape and the payload used to create one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of bytes kept from the tail of stdout/stderr.
pub const OUTPUT_TAIL_LIMIT: usize = 8 * 1024;

/// Lifecycle state of a job. `failed` never rests at this value — a retryable
/// failure returns the job to `pending` with `run_at` pushed into the future;
/// `failed` exists only as a label inside error-kind classification, not as an
/// observable row state (see spec Open Question on this).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Processing,
    Completed,
    Dead,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Processing => "processing",
            JobState::Completed => "completed",
            JobState::Dead => "dead",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(JobState::Pending),
            "processing" => Some(JobState::Processing),
            "completed" => Some(JobState::Completed),
            "dead" => Some(JobState::Dead),
            _ => None,
        }
    }
}

/// A durable job row, matching §3.1 of the design exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub command: String,
    pub priority: i64,
    pub run_at: DateTime<Utc>,
    pub state: JobState,
    pub attempts: i64,
    pub max_retries: i64,
    pub backoff_base: f64,
    pub timeout_s: i64,
    pub locked_by: Option<String>,
    pub lock_expires_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub stdout_tail: Option<String>,
    pub stderr_tail: Option<String>,
    pub exit_code: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Caller-supplied payload for `Store::enqueue`. Mirrors the wire schema of
/// §6.2: unknown fields are rejected at the deserialization boundary (the CLI
/// layer), not here — by the time an `EnqueueSpec` exists it has already been
/// validated.
#[derive(Debug, Clone)]
pub struct EnqueueSpec {
    pub id: Option<String>,
    pub command: String,
    pub priority: i64,
    pub run_at: Option<DateTime<Utc>>,
    pub timeout_s: i64,
    pub max_retries: Option<i64>,
    pub backoff_base: Option<f64>,
}

impl EnqueueSpec {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            id: None,
            command: command.into(),
            priority: 0,
            run_at: None,
            timeout_s: 0,
            max_retries: None,
            backoff_base: None,
        }
    }
}

/// Filter for `Store::list`. `None` fields mean "no constraint".
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub state: Option<JobState>,
    pub pending_ready_only: bool,
}

/// Aggregate counts used by `jobctl status`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct Stats {
    pub pending: i64,
    pub processing: i64,
    pub completed: i64,
    pub dead: i64,
}

/// Truncate to the last `OUTPUT_TAIL_LIMIT` bytes on a UTF-8 boundary.
pub fn truncate_tail(bytes: &[u8]) -> String {
    let start = bytes.len().saturating_sub(OUTPUT_TAIL_LIMIT);
    let mut start = start;
    while start < bytes.len() && !bytes.is_char_boundary(start) {
        start += 1;
    }
    String::from_utf8_lossy(&bytes[start..]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_tail_keeps_last_bytes_only() {
        let data = vec![b'a'; OUTPUT_TAIL_LIMIT + 100];
        let tail = truncate_tail(&data);
        assert_eq!(tail.len(), OUTPUT_TAIL_LIMIT);
    }

    #[test]
    fn truncate_tail_passes_through_short_input() {
        let tail = truncate_tail(b"ok");
        assert_eq!(tail, "ok");
    }

    #[test]
    fn job_state_round_trips_through_str() {
        for s in [
            JobState::Pending,
            JobState::Processing,
            JobState::Completed,
            JobState::Dead,
        ] {
            assert_eq!(JobState::parse(s.as_str()), Some(s));
        }
    }
}
