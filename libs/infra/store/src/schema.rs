//! Idempotent schema bootstrap, applied once at connect time. Every
//! statement is `CREATE ... IF NOT EXISTS` so that startup never fails
//! against an already-migrated database and migrations stay additive.

use libsql::Connection;
use tracing::info;

use crate::errors::StoreError;

const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS jobs (
        id TEXT PRIMARY KEY,
        submitter_id TEXT NOT NULL,
        code TEXT NOT NULL,
        language TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'queued',
        worker_id TEXT,
        created_at REAL NOT NULL,
        started_at REAL,
        completed_at REAL,
        stdout TEXT NOT NULL DEFAULT '',
        stderr TEXT NOT NULL DEFAULT '',
        exit_code INTEGER,
        limits_json TEXT NOT NULL DEFAULT '{}',
        reserved_cost REAL NOT NULL DEFAULT 0,
        actual_cost REAL,
        actual_duration_seconds REAL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS workers (
        id TEXT PRIMARY KEY,
        owner_id TEXT,
        ip TEXT,
        caps_json TEXT NOT NULL DEFAULT '{}',
        status TEXT NOT NULL DEFAULT 'offline',
        auth_token TEXT,
        last_heartbeat REAL,
        jobs_completed INTEGER NOT NULL DEFAULT 0
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS user_credits (
        user_id TEXT PRIMARY KEY,
        balance REAL NOT NULL,
        total_earned REAL NOT NULL DEFAULT 0,
        total_spent REAL NOT NULL DEFAULT 0,
        last_updated REAL NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS user_auth (
        user_id TEXT PRIMARY KEY,
        auth_token TEXT NOT NULL,
        created_at REAL NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_jobs_submitter_status ON jobs(submitter_id, status)",
    "CREATE INDEX IF NOT EXISTS idx_jobs_worker ON jobs(worker_id)",
    "CREATE INDEX IF NOT EXISTS idx_workers_owner_status ON workers(owner_id, status)",
];

pub(crate) async fn apply(conn: &Connection) -> Result<(), StoreError> {
    for statement in STATEMENTS {
        conn.execute(statement, ()).await?;
    }
    info!("store schema applied");
    Ok(())
}
