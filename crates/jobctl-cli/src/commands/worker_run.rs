//! `worker-run`: the actual Worker process entry point. Hidden from
//! `--help`; only the Supervisor (via `worker start`) spawns it.
//!
//! Drives a [`jobctl_core::Worker`] against [`SqliteStore`] +
//! [`ShellExecutor`], plus a sweep task (§4.5) that reclaims expired leases
//! on a fixed cadence independent of `poll_interval_ms`, since recovery must
//! proceed even while the worker itself is busy running a job.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use jobctl_core::{ShellExecutor, Store, Worker};
use jobctl_sqlite::SqliteStore;
use tokio::sync::watch;

use crate::env;
use crate::error::CliResult;

const SWEEP_INTERVAL: Duration = Duration::from_secs(30);

pub async fn run(db_path: &Path, worker_nonce: u64) -> CliResult<()> {
    let worker_id = format!("{}#{}#{}", env::hostname(), std::process::id(), worker_nonce);
    tracing::info!(worker_id = %worker_id, "worker-run starting");

    let store = Arc::new(SqliteStore::open(db_path).await?);
    let executor = Arc::new(ShellExecutor);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let sweep_store = Arc::clone(&store);
    let sweep_shutdown = shutdown_tx.subscribe();
    let sweep_handle = tokio::spawn(sweep_loop(sweep_store, sweep_shutdown));

    let signal_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = signal_tx.send(true);
        }
    });
    #[cfg(unix)]
    {
        let term_tx = shutdown_tx.clone();
        tokio::spawn(async move {
            if let Ok(mut term) = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                term.recv().await;
                let _ = term_tx.send(true);
            }
        });
    }

    let worker = Worker::new(worker_id, store, executor, shutdown_rx);
    worker.run().await;

    let _ = shutdown_tx.send(true);
    sweep_handle.abort();
    Ok(())
}

async fn sweep_loop(store: Arc<SqliteStore>, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match store.sweep_expired_locks(Utc::now()).await {
                    Ok(0) => {}
                    Ok(n) => tracing::info!(reclaimed = n, "swept expired locks"),
                    Err(e) => tracing::warn!(error = %e, "sweep failed"),
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    break;
                }
            }
        }
    }
}
