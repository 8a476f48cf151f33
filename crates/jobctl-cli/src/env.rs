//! Resolves the single on-disk database file (§6.4): `JOBCTL_DB_PATH` if
//! set, else `./jobctl.db` in the current working directory. The pid-map
//! file lives alongside it.

use std::path::PathBuf;

pub const DB_PATH_VAR: &str = "JOBCTL_DB_PATH";

pub fn db_path() -> PathBuf {
    std::env::var_os(DB_PATH_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("./jobctl.db"))
}

pub fn pid_map_path(db_path: &std::path::Path) -> PathBuf {
    let mut s = db_path.as_os_str().to_owned();
    s.push(".workers.pid");
    PathBuf::from(s)
}

/// Used as the first segment of a Worker's `hostname#pid#nonce` id (see the
/// glossary's "Worker identity" entry). Reads the `HOSTNAME` env var set by
/// the shell or container runtime rather than pulling in a libc binding for
/// a single read-only syscall.
pub fn hostname() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string())
}
