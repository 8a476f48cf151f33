//! Schema for the single SQLite database file named in §6.4: three logical
//! tables, `jobs`, `config`, `workers`.

pub const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS jobs (
    id              TEXT PRIMARY KEY,
    command         TEXT NOT NULL,
    priority        INTEGER NOT NULL DEFAULT 0,
    run_at          TEXT NOT NULL,
    state           TEXT NOT NULL DEFAULT 'pending',
    attempts        INTEGER NOT NULL DEFAULT 0,
    max_retries     INTEGER NOT NULL,
    backoff_base    REAL NOT NULL,
    timeout_s       INTEGER NOT NULL DEFAULT 0,
    locked_by       TEXT,
    lock_expires_at TEXT,
    last_error      TEXT,
    stdout_tail     TEXT,
    stderr_tail     TEXT,
    exit_code       INTEGER,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL,
    started_at      TEXT,
    finished_at     TEXT
);

CREATE INDEX IF NOT EXISTS idx_jobs_ready
    ON jobs (priority DESC, run_at ASC, created_at ASC)
    WHERE state = 'pending';

CREATE INDEX IF NOT EXISTS idx_jobs_lock_expiry
    ON jobs (lock_expires_at)
    WHERE state = 'processing';

CREATE TABLE IF NOT EXISTS config (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    kind  TEXT NOT NULL CHECK (kind IN ('int', 'float'))
);

CREATE TABLE IF NOT EXISTS workers (
    worker_id      TEXT PRIMARY KEY,
    pid            INTEGER NOT NULL,
    started_at     TEXT NOT NULL,
    last_heartbeat TEXT NOT NULL
);
"#;
