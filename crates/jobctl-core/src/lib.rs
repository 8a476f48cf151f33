//! Durable job-dispatch engine: the core covered by the design.
//!
//! Five cooperating components, leaves first:
//! [`store`] (durable persistence + the claim protocol), the lock manager
//! (embedded in [`store::Store`] and [`worker::Worker`]), [`retry`] (pure
//! backoff function), [`worker`] (the poll/run/finalize loop), and
//! [`supervisor`] (the Worker process pool). [`config`] is the live-readable
//! tunable store threaded through all of them.
//!
//! This crate defines the contracts; `jobctl-sqlite` is the concrete
//! `Store`, and `jobctl-testing` is the in-memory one used by this crate's
//! own tests and by `jobctl-cli`.

pub mod config;
pub mod error;
pub mod executor;
pub mod job;
pub mod retry;
pub mod store;
pub mod supervisor;
pub mod worker;

pub use config::{ConfigCache, ConfigKey, ConfigType, ConfigValue};
pub use error::{Result, StoreError};
pub use executor::{ExecResult, Executor, Outcome, ShellExecutor};
pub use job::{EnqueueSpec, Job, JobState, ListFilter, Stats, OUTPUT_TAIL_LIMIT};
pub use retry::{next_delay_secs, FastrandJitter, JitterSource};
pub use store::{FailureOutcome, Store, WorkerRegistration};
pub use supervisor::{Supervisor, SupervisorError, WorkerProcessSpec};
pub use worker::{Tick, Worker};
