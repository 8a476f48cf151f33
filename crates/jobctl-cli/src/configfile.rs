//! `jobctl.toml`: an optional on-disk file read at `init` to seed the
//! `config` table's initial values. Absent keys keep the Store's built-in
//! defaults (`ConfigKey::default_value`); this file only overrides them.

use jobctl_core::ConfigKey;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    pub max_retries: Option<i64>,
    pub backoff_base: Option<f64>,
    pub poll_interval_ms: Option<i64>,
    pub lock_timeout_s: Option<i64>,
    pub job_timeout_s: Option<i64>,
    pub max_backoff_s: Option<i64>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    /// Raw string overrides keyed by `ConfigKey`, ready for
    /// `ConfigKey::coerce` + `Store::set_config`.
    pub fn overrides(&self) -> Vec<(ConfigKey, String)> {
        let mut out = Vec::new();
        if let Some(v) = self.max_retries {
            out.push((ConfigKey::MaxRetries, v.to_string()));
        }
        if let Some(v) = self.backoff_base {
            out.push((ConfigKey::BackoffBase, v.to_string()));
        }
        if let Some(v) = self.poll_interval_ms {
            out.push((ConfigKey::PollIntervalMs, v.to_string()));
        }
        if let Some(v) = self.lock_timeout_s {
            out.push((ConfigKey::LockTimeoutS, v.to_string()));
        }
        if let Some(v) = self.job_timeout_s {
            out.push((ConfigKey::JobTimeoutS, v.to_string()));
        }
        if let Some(v) = self.max_backoff_s {
            out.push((ConfigKey::MaxBackoffS, v.to_string()));
        }
        out
    }
}
