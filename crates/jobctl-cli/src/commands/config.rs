use std::path::Path;

use jobctl_core::{ConfigKey, Store};
use jobctl_sqlite::SqliteStore;

use crate::error::{CliError, CliResult};

pub async fn get(db_path: &Path, key: Option<String>) -> CliResult<()> {
    let store = SqliteStore::open(db_path).await?;

    match key {
        Some(key) => {
            let parsed = ConfigKey::parse(&key)
                .ok_or_else(|| CliError::Input(format!("unknown config key: {key:?}")))?;
            let value = store
                .get_config(parsed.as_str())
                .await?
                .unwrap_or_else(|| parsed.default_value());
            println!("{} = {}", parsed.as_str(), value.to_db_string());
        }
        None => {
            for key in ConfigKey::ALL {
                let value = store
                    .get_config(key.as_str())
                    .await?
                    .unwrap_or_else(|| key.default_value());
                println!("{} = {}", key.as_str(), value.to_db_string());
            }
        }
    }
    Ok(())
}

pub async fn set(db_path: &Path, key: &str, raw_value: &str) -> CliResult<()> {
    let parsed_key = ConfigKey::parse(key)
        .ok_or_else(|| CliError::Input(format!("unknown config key: {key:?}")))?;
    let value = parsed_key.coerce(raw_value)?;

    let store = SqliteStore::open(db_path).await?;
    store.set_config(parsed_key.as_str(), value).await?;
    println!("{} = {}", parsed_key.as_str(), value.to_db_string());
    Ok(())
}
