use std::path::Path;

use chrono::Utc;
use jobctl_core::Store;
use jobctl_sqlite::SqliteStore;

use crate::error::CliResult;
use crate::render;

pub async fn list(db_path: &Path, json: bool) -> CliResult<()> {
    let store = SqliteStore::open(db_path).await?;
    let jobs = store.dlq_list().await?;
    if json {
        render::jobs_json(&jobs);
    } else {
        render::jobs_table(&jobs);
    }
    Ok(())
}

pub async fn retry(db_path: &Path, id: &str) -> CliResult<()> {
    let store = SqliteStore::open(db_path).await?;
    store.dlq_retry(id, Utc::now()).await?;
    println!("{id} requeued");
    Ok(())
}
