//! `enqueue`: validates the §6.2 JSON payload (rejecting unknown fields)
//! before handing it to `Store::enqueue`. A single job or a JSON array of
//! jobs may be supplied; bulk enqueue is not all-or-nothing — each job
//! reports its own outcome.

use std::path::Path;

use chrono::{DateTime, Utc};
use jobctl_core::job::EnqueueSpec;
use jobctl_core::Store;
use jobctl_sqlite::SqliteStore;
use serde::Deserialize;

use crate::error::{CliError, CliResult};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EnqueuePayload {
    id: Option<String>,
    command: String,
    #[serde(default)]
    priority: i64,
    run_at: Option<DateTime<Utc>>,
    #[serde(default)]
    timeout_s: i64,
    max_retries: Option<i64>,
    backoff_base: Option<f64>,
}

impl From<EnqueuePayload> for EnqueueSpec {
    fn from(p: EnqueuePayload) -> Self {
        EnqueueSpec {
            id: p.id,
            command: p.command,
            priority: p.priority,
            run_at: p.run_at,
            timeout_s: p.timeout_s,
            max_retries: p.max_retries,
            backoff_base: p.backoff_base,
        }
    }
}

enum Payloads {
    One(EnqueuePayload),
    Many(Vec<EnqueuePayload>),
}

fn parse_payload(raw: &str) -> CliResult<Payloads> {
    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| CliError::Input(format!("invalid JSON: {e}")))?;
    if value.is_array() {
        let many: Vec<EnqueuePayload> = serde_json::from_value(value)
            .map_err(|e| CliError::Input(format!("invalid enqueue payload: {e}")))?;
        Ok(Payloads::Many(many))
    } else {
        let one: EnqueuePayload = serde_json::from_value(value)
            .map_err(|e| CliError::Input(format!("invalid enqueue payload: {e}")))?;
        Ok(Payloads::One(one))
    }
}

pub async fn run(db_path: &Path, raw_json: &str) -> CliResult<()> {
    let store = SqliteStore::open(db_path).await?;
    let now = Utc::now();

    match parse_payload(raw_json)? {
        Payloads::One(payload) => {
            let id = store.enqueue(payload.into(), now).await?;
            println!("{id}");
        }
        Payloads::Many(payloads) => {
            for payload in payloads {
                let command = payload.command.clone();
                match store.enqueue(payload.into(), now).await {
                    Ok(id) => println!("{id}"),
                    Err(e) => eprintln!("failed to enqueue {command:?}: {e}"),
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_fields() {
        let raw = r#"{"command": "echo hi", "bogus": 1}"#;
        assert!(parse_payload(raw).is_err());
    }

    #[test]
    fn accepts_minimal_payload() {
        let raw = r#"{"command": "echo hi"}"#;
        assert!(matches!(parse_payload(raw).unwrap(), Payloads::One(_)));
    }

    #[test]
    fn accepts_bulk_array() {
        let raw = r#"[{"command": "echo a"}, {"command": "echo b"}]"#;
        match parse_payload(raw).unwrap() {
            Payloads::Many(v) => assert_eq!(v.len(), 2),
            Payloads::One(_) => panic!("expected Many"),
        }
    }
}
