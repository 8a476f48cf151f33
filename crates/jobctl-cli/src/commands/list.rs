use std::path::Path;

use jobctl_core::job::{JobState, ListFilter};
use jobctl_core::Store;
use jobctl_sqlite::SqliteStore;

use crate::error::{CliError, CliResult};
use crate::render;

pub async fn run(
    db_path: &Path,
    state: Option<String>,
    pending_ready_only: bool,
    json: bool,
) -> CliResult<()> {
    let state = state
        .map(|s| {
            JobState::parse(&s).ok_or_else(|| CliError::Input(format!("unknown job state: {s:?}")))
        })
        .transpose()?;

    let store = SqliteStore::open(db_path).await?;
    let jobs = store
        .list(ListFilter {
            state,
            pending_ready_only,
        })
        .await?;

    if json {
        render::jobs_json(&jobs);
    } else {
        render::jobs_table(&jobs);
    }
    Ok(())
}
