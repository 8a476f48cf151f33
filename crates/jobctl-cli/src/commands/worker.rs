//! `worker start`/`worker stop`: the human-facing half of the Supervisor.
//! The actual per-process entry point is the hidden `worker-run`
//! subcommand in [`crate::commands::worker_run`].

use std::path::Path;
use std::time::Duration;

use jobctl_core::{Supervisor, WorkerProcessSpec};
use jobctl_sqlite::SqliteStore;

use crate::env;
use crate::error::{CliError, CliResult};

const STOP_GRACE: Duration = Duration::from_secs(10);

pub async fn start(db_path: &Path, count: u32) -> CliResult<()> {
    let exe_path =
        std::env::current_exe().map_err(|e| CliError::Other(anyhow::anyhow!(e)))?;
    let spec = WorkerProcessSpec {
        exe_path,
        args_template: vec![
            "worker-run".to_string(),
            "--db".to_string(),
            db_path.display().to_string(),
        ],
    };

    let supervisor = Supervisor::new(env::pid_map_path(db_path));
    let spawned = supervisor.start(count, &env::hostname(), &spec)?;
    for w in &spawned {
        println!("started {} (pid {})", w.worker_id, w.pid);
    }
    Ok(())
}

pub async fn stop(db_path: &Path) -> CliResult<()> {
    let store = SqliteStore::open(db_path).await?;
    let supervisor = Supervisor::new(env::pid_map_path(db_path));
    let n = supervisor.stop(&store, STOP_GRACE).await?;
    println!("stopped {n} worker(s)");
    Ok(())
}
