use std::path::Path;

use jobctl_core::Store;
use jobctl_sqlite::SqliteStore;

use crate::error::CliResult;

/// Prints the job's tail-truncated stdout/stderr and its last error, the
/// only "logs" a single-node dispatcher keeps (§3.1's `stdout_tail` /
/// `stderr_tail` / `last_error`).
pub async fn run(db_path: &Path, id: &str) -> CliResult<()> {
    let store = SqliteStore::open(db_path).await?;
    let job = store.get(id).await?;

    println!("job:    {}", job.id);
    println!("state:  {}", job.state.as_str());
    println!("exit:   {}", job.exit_code.map(|c| c.to_string()).unwrap_or_else(|| "-".to_string()));
    if let Some(err) = &job.last_error {
        println!("error:  {err}");
    }
    println!("--- stdout ---");
    println!("{}", job.stdout_tail.unwrap_or_default());
    println!("--- stderr ---");
    println!("{}", job.stderr_tail.unwrap_or_default());
    Ok(())
}
