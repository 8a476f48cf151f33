//! Library error type and the input/conflict classification the CLI boundary
//! maps to exit codes.

use thiserror::Error;

/// Errors raised by the `Store` and `Config` contracts.
///
/// Kept as one enum (rather than a per-operation type) because every
/// operation in `jobctl-core` is shallow enough that callers match on a
/// handful of the same variants across the board — the teacher's
/// `SeesawError` takes the same shape.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("job id {0:?} already exists")]
    DuplicateId(String),

    #[error("job {0:?} not found")]
    NotFound(String),

    #[error("worker {worker_id:?} no longer holds the lock on job {job_id:?}")]
    LostLock { job_id: String, worker_id: String },

    #[error("job {0:?} is not in the dead-letter state")]
    NotDead(String),

    #[error("unknown config key {0:?}")]
    UnknownConfigKey(String),

    #[error("invalid value {value:?} for config key {key:?}: {reason}")]
    InvalidConfigValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("database error: {0}")]
    Backend(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Classifies the error per §7: input errors exit 2, everything else
    /// (conflict, lost-lock, transient/backend) exits 1. Lost-lock is not an
    /// input error — it is expected contention, logged and discarded by the
    /// Worker rather than surfaced to a human caller at all.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            StoreError::UnknownConfigKey(_) | StoreError::InvalidConfigValue { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
