//! Typed, coerced key/value tunables (§3.3, §4.6).
//!
//! Values live in the Store's `config` table; this module only owns the
//! typed schema and an in-memory cache that Workers refresh once per poll
//! iteration. There is no push invalidation — a `set` takes effect for other
//! processes on their next poll, by design (§4.6).

use crate::error::{Result, StoreError};
use std::collections::HashMap;

/// A config value after type coercion. Only `int` and `float` are needed by
/// the tunables in §3.3.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigValue {
    Int(i64),
    Float(f64),
}

impl ConfigValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ConfigValue::Int(v) => Some(*v),
            ConfigValue::Float(v) => Some(*v as i64),
        }
    }

    pub fn as_float(&self) -> f64 {
        match self {
            ConfigValue::Int(v) => *v as f64,
            ConfigValue::Float(v) => *v,
        }
    }

    pub fn to_db_string(&self) -> String {
        match self {
            ConfigValue::Int(v) => v.to_string(),
            ConfigValue::Float(v) => v.to_string(),
        }
    }
}

/// Type tag a config key is coerced to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigType {
    Int,
    Float,
}

/// The six tunables named in §3.3, with their type and default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    MaxRetries,
    BackoffBase,
    PollIntervalMs,
    LockTimeoutS,
    JobTimeoutS,
    MaxBackoffS,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 6] = [
        ConfigKey::MaxRetries,
        ConfigKey::BackoffBase,
        ConfigKey::PollIntervalMs,
        ConfigKey::LockTimeoutS,
        ConfigKey::JobTimeoutS,
        ConfigKey::MaxBackoffS,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigKey::MaxRetries => "max_retries",
            ConfigKey::BackoffBase => "backoff_base",
            ConfigKey::PollIntervalMs => "poll_interval_ms",
            ConfigKey::LockTimeoutS => "lock_timeout_s",
            ConfigKey::JobTimeoutS => "job_timeout_s",
            ConfigKey::MaxBackoffS => "max_backoff_s",
        }
    }

    pub fn parse(key: &str) -> Option<ConfigKey> {
        ConfigKey::ALL.into_iter().find(|k| k.as_str() == key)
    }

    pub fn value_type(&self) -> ConfigType {
        match self {
            ConfigKey::BackoffBase => ConfigType::Float,
            _ => ConfigType::Int,
        }
    }

    pub fn default_value(&self) -> ConfigValue {
        match self {
            ConfigKey::MaxRetries => ConfigValue::Int(3),
            ConfigKey::BackoffBase => ConfigValue::Float(2.0),
            ConfigKey::PollIntervalMs => ConfigValue::Int(500),
            ConfigKey::LockTimeoutS => ConfigValue::Int(300),
            ConfigKey::JobTimeoutS => ConfigValue::Int(0),
            ConfigKey::MaxBackoffS => ConfigValue::Int(3600),
        }
    }

    /// Coerce a raw string (as supplied by `config set` or a config file)
    /// into this key's declared type, rejecting out-of-range values per the
    /// constraints in §3.3 (`max_retries >= 0`, `backoff_base > 1`, etc).
    pub fn coerce(&self, raw: &str) -> Result<ConfigValue> {
        let invalid = |reason: &str| StoreError::InvalidConfigValue {
            key: self.as_str().to_string(),
            value: raw.to_string(),
            reason: reason.to_string(),
        };

        match self.value_type() {
            ConfigType::Int => {
                let v: i64 = raw.parse().map_err(|_| invalid("not an integer"))?;
                match self {
                    ConfigKey::MaxRetries if v < 0 => Err(invalid("must be >= 0")),
                    ConfigKey::PollIntervalMs if v <= 0 => Err(invalid("must be > 0")),
                    ConfigKey::LockTimeoutS if v <= 0 => Err(invalid("must be > 0")),
                    ConfigKey::JobTimeoutS if v < 0 => Err(invalid("must be >= 0")),
                    ConfigKey::MaxBackoffS if v <= 0 => Err(invalid("must be > 0")),
                    _ => Ok(ConfigValue::Int(v)),
                }
            }
            ConfigType::Float => {
                let v: f64 = raw.parse().map_err(|_| invalid("not a number"))?;
                if v <= 1.0 {
                    Err(invalid("must be > 1"))
                } else {
                    Ok(ConfigValue::Float(v))
                }
            }
        }
    }
}

/// In-memory view over the persisted config table, polled (not pushed).
#[derive(Debug, Clone, Default)]
pub struct ConfigCache {
    values: HashMap<String, ConfigValue>,
}

impl ConfigCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cache wholesale from a freshly-read snapshot.
    pub fn load(entries: Vec<(String, ConfigValue)>) -> Self {
        Self {
            values: entries.into_iter().collect(),
        }
    }

    pub fn get(&self, key: ConfigKey) -> ConfigValue {
        self.values
            .get(key.as_str())
            .copied()
            .unwrap_or_else(|| key.default_value())
    }

    pub fn get_int(&self, key: ConfigKey) -> i64 {
        self.get(key).as_int().unwrap_or(0)
    }

    pub fn get_float(&self, key: ConfigKey) -> f64 {
        self.get(key).as_float()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_falls_back_to_default() {
        let cache = ConfigCache::new();
        assert_eq!(cache.get_int(ConfigKey::MaxRetries), 3);
        assert_eq!(cache.get_float(ConfigKey::BackoffBase), 2.0);
    }

    #[test]
    fn coerce_rejects_out_of_range() {
        assert!(ConfigKey::MaxRetries.coerce("-1").is_err());
        assert!(ConfigKey::BackoffBase.coerce("1.0").is_err());
        assert!(ConfigKey::PollIntervalMs.coerce("0").is_err());
        assert!(ConfigKey::BackoffBase.coerce("2.5").is_ok());
    }

    #[test]
    fn parse_rejects_unknown_key() {
        assert!(ConfigKey::parse("not_a_real_key").is_none());
    }
}
