//! Maps library errors to the exit codes of §6.3/§7: 0 success, 1 generic
//! failure, 2 invalid input. Mirrors the teacher's split between a typed
//! library error and a boundary-level classification.

use jobctl_core::{StoreError, SupervisorError};

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Supervisor(#[from] SupervisorError),
    #[error("{0}")]
    Input(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Store(e) if e.is_input_error() => 2,
            CliError::Input(_) => 2,
            CliError::Store(_) | CliError::Supervisor(_) | CliError::Other(_) => 1,
        }
    }
}

pub type CliResult<T> = Result<T, CliError>;
