use std::path::Path;

use jobctl_core::{ConfigKey, Store};
use jobctl_sqlite::SqliteStore;

use crate::configfile::ConfigFile;
use crate::error::CliResult;

/// Create the database file (idempotent) and seed `config` defaults from
/// `jobctl.toml` if present in the current directory.
pub async fn run(db_path: &Path) -> CliResult<()> {
    let store = SqliteStore::open(db_path).await?;

    let config_file = ConfigFile::load(Path::new("jobctl.toml"))?;
    for (key, raw) in config_file.overrides() {
        let value = key.coerce(&raw)?;
        store.set_config(key.as_str(), value).await?;
    }

    println!("initialized {}", db_path.display());
    Ok(())
}
