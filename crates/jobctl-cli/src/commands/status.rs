use std::path::Path;

use jobctl_core::Store;
use jobctl_sqlite::SqliteStore;

use crate::error::CliResult;
use crate::render;

pub async fn run(db_path: &Path, json: bool) -> CliResult<()> {
    let store = SqliteStore::open(db_path).await?;
    let stats = store.stats().await?;

    if json {
        render::stats_json(&stats);
    } else {
        render::stats_table(&stats);
    }
    Ok(())
}
