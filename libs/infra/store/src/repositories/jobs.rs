//! Job repository (§4.1). Every mutating function here assumes it is
//! called with the store's single connection while its caller holds the
//! serializing lock; CAS-style transitions still use an explicit
//! transaction so the guard and the write commit atomically.

use gridx_domain_models::job::{Job, JobLimits, JobStatus, Language};
use libsql::{params, Connection, Row};
use uuid::Uuid;

use crate::errors::StoreError;

const COLUMNS: &str = "id, submitter_id, code, language, status, worker_id, created_at, \
     started_at, completed_at, stdout, stderr, exit_code, limits_json, reserved_cost, \
     actual_cost, actual_duration_seconds";

pub(crate) async fn create_job(
    conn: &Connection,
    id: Uuid,
    submitter_id: &str,
    code: &str,
    language: Language,
    limits: &JobLimits,
    reserved_cost: f64,
    now: f64,
) -> Result<(), StoreError> {
    let limits_json = serde_json::to_string(limits).map_err(|e| StoreError::Mapping(e.to_string()))?;
    conn.execute(
        "INSERT INTO jobs (id, submitter_id, code, language, status, created_at, \
         limits_json, reserved_cost) VALUES (?1, ?2, ?3, ?4, 'queued', ?5, ?6, ?7)",
        params![
            id.to_string(),
            submitter_id,
            code,
            language.as_str(),
            now,
            limits_json,
            reserved_cost
        ],
    )
    .await?;
    Ok(())
}

pub(crate) async fn get_job(conn: &Connection, id: Uuid) -> Result<Option<Job>, StoreError> {
    let sql = format!("SELECT {COLUMNS} FROM jobs WHERE id = ?1");
    let mut rows = conn.query(&sql, params![id.to_string()]).await?;
    match rows.next().await? {
        Some(row) => Ok(Some(row_to_job(&row)?)),
        None => Ok(None),
    }
}

pub(crate) async fn list_jobs_by_submitter(
    conn: &Connection,
    submitter_id: &str,
    limit: i64,
) -> Result<Vec<Job>, StoreError> {
    let capped = limit.clamp(1, 100);
    let sql =
        format!("SELECT {COLUMNS} FROM jobs WHERE submitter_id = ?1 ORDER BY created_at DESC LIMIT ?2");
    let mut rows = conn.query(&sql, params![submitter_id, capped]).await?;
    let mut jobs = Vec::new();
    while let Some(row) = rows.next().await? {
        jobs.push(row_to_job(&row)?);
    }
    Ok(jobs)
}

pub(crate) async fn mark_started(conn: &Connection, id: Uuid, now: f64) -> Result<(), StoreError> {
    conn.execute(
        "UPDATE jobs SET started_at = ?1 WHERE id = ?2 AND started_at IS NULL",
        params![now, id.to_string()],
    )
    .await?;
    Ok(())
}

/// CAS-assign (§4.5): only transitions a still-queued job, and marks the
/// worker busy in the same transaction as the job's row so a lost race
/// never leaves a worker marked busy for a job it didn't win.
pub(crate) async fn assign_to_worker(
    conn: &Connection,
    job_id: Uuid,
    worker_id: Uuid,
    now: f64,
) -> Result<bool, StoreError> {
    let txn = conn.transaction().await?;

    let mut rows = txn
        .query("SELECT status FROM jobs WHERE id = ?1", params![job_id.to_string()])
        .await?;
    let status: Option<String> = match rows.next().await? {
        Some(row) => Some(row.get::<String>(0)?),
        None => None,
    };

    if status.as_deref() != Some("queued") {
        txn.rollback().await?;
        return Ok(false);
    }

    txn.execute(
        "UPDATE jobs SET status = 'running', worker_id = ?1, started_at = ?2 WHERE id = ?3",
        params![worker_id.to_string(), now, job_id.to_string()],
    )
    .await?;
    txn.execute(
        "UPDATE workers SET status = 'busy' WHERE id = ?1",
        params![worker_id.to_string()],
    )
    .await?;

    txn.commit().await?;
    Ok(true)
}

pub(crate) async fn reset_to_queued(conn: &Connection, job_id: Uuid) -> Result<(), StoreError> {
    conn.execute(
        "UPDATE jobs SET status = 'queued', worker_id = NULL, started_at = NULL \
         WHERE id = ?1",
        params![job_id.to_string()],
    )
    .await?;
    Ok(())
}

/// Atomically resolves a running job (§4.1) and, on a zero exit code, bumps
/// the worker's completed-job counter (§AMBIENT bookkeeping).
pub(crate) async fn complete(
    conn: &Connection,
    job_id: Uuid,
    worker_id: Uuid,
    stdout: &str,
    stderr: &str,
    exit_code: i64,
    now: f64,
) -> Result<(), StoreError> {
    let status = if exit_code == 0 { "completed" } else { "failed" };

    let txn = conn.transaction().await?;
    txn.execute(
        "UPDATE jobs SET status = ?1, completed_at = ?2, stdout = ?3, stderr = ?4, \
         exit_code = ?5 WHERE id = ?6",
        params![status, now, stdout, stderr, exit_code, job_id.to_string()],
    )
    .await?;

    txn.execute(
        "UPDATE workers SET status = 'idle' WHERE id = ?1",
        params![worker_id.to_string()],
    )
    .await?;

    if exit_code == 0 {
        txn.execute(
            "UPDATE workers SET jobs_completed = jobs_completed + 1 WHERE id = ?1",
            params![worker_id.to_string()],
        )
        .await?;
    }

    txn.commit().await?;
    Ok(())
}

pub(crate) async fn record_settlement(
    conn: &Connection,
    job_id: Uuid,
    actual_cost: f64,
    duration_seconds: Option<f64>,
) -> Result<(), StoreError> {
    conn.execute(
        "UPDATE jobs SET actual_cost = ?1, actual_duration_seconds = ?2 WHERE id = ?3",
        params![actual_cost, duration_seconds, job_id.to_string()],
    )
    .await?;
    Ok(())
}

/// Teardown/watchdog requeue (§4.4, §4.6): returns the ids that were reset
/// so the caller can push them back onto the in-memory FIFO.
pub(crate) async fn requeue_running_for_worker(
    conn: &Connection,
    worker_id: Uuid,
) -> Result<Vec<Uuid>, StoreError> {
    let txn = conn.transaction().await?;

    let mut rows = txn
        .query(
            "SELECT id FROM jobs WHERE status = 'running' AND worker_id = ?1",
            params![worker_id.to_string()],
        )
        .await?;
    let mut ids = Vec::new();
    while let Some(row) = rows.next().await? {
        let raw: String = row.get(0)?;
        ids.push(Uuid::parse_str(&raw).map_err(|e| StoreError::Mapping(e.to_string()))?);
    }

    if !ids.is_empty() {
        txn.execute(
            "UPDATE jobs SET status = 'queued', worker_id = NULL, started_at = NULL \
             WHERE status = 'running' AND worker_id = ?1",
            params![worker_id.to_string()],
        )
        .await?;
    }

    txn.commit().await?;
    Ok(ids)
}

pub(crate) async fn list_running(conn: &Connection) -> Result<Vec<Job>, StoreError> {
    let sql = format!("SELECT {COLUMNS} FROM jobs WHERE status = 'running'");
    let mut rows = conn.query(&sql, ()).await?;
    let mut jobs = Vec::new();
    while let Some(row) = rows.next().await? {
        jobs.push(row_to_job(&row)?);
    }
    Ok(jobs)
}

fn row_to_job(row: &Row) -> Result<Job, StoreError> {
    let id: String = row.get(0)?;
    let submitter_id: String = row.get(1)?;
    let code: String = row.get(2)?;
    let language: String = row.get(3)?;
    let status: String = row.get(4)?;
    let worker_id: Option<String> = row.get(5)?;
    let created_at: f64 = row.get(6)?;
    let started_at: Option<f64> = row.get(7)?;
    let completed_at: Option<f64> = row.get(8)?;
    let stdout: String = row.get(9)?;
    let stderr: String = row.get(10)?;
    let exit_code: Option<i64> = row.get(11)?;
    let limits_json: String = row.get(12)?;
    let reserved_cost: f64 = row.get(13)?;
    let actual_cost: Option<f64> = row.get(14)?;
    let actual_duration_seconds: Option<f64> = row.get(15)?;

    Ok(Job {
        id: Uuid::parse_str(&id).map_err(|e| StoreError::Mapping(e.to_string()))?,
        submitter_id,
        code,
        language: Language::parse(&language)
            .ok_or_else(|| StoreError::Mapping(format!("unknown language {language}")))?,
        status: JobStatus::parse(&status)
            .ok_or_else(|| StoreError::Mapping(format!("unknown job status {status}")))?,
        worker_id: worker_id
            .map(|raw| Uuid::parse_str(&raw))
            .transpose()
            .map_err(|e| StoreError::Mapping(e.to_string()))?,
        created_at,
        started_at,
        completed_at,
        stdout,
        stderr,
        exit_code,
        limits: JobLimits::from_json_or_default(&limits_json),
        reserved_cost,
        actual_cost,
        actual_duration_seconds,
    })
}
