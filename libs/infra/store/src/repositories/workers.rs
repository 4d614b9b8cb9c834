//! Worker repository (§4.1, §4.4). The registry's in-memory state is the
//! authority for "is this worker alive"; this table is the durable mirror
//! used by the HTTP surface, the watchdog, and hello/reconnect lookups.

use gridx_domain_models::worker::{Worker, WorkerCapabilities, WorkerStatus};
use libsql::{params, Connection, Row};
use uuid::Uuid;

use crate::errors::StoreError;

const COLUMNS: &str = "id, owner_id, ip, caps_json, status, auth_token, last_heartbeat, jobs_completed";

pub(crate) async fn upsert(
    conn: &Connection,
    id: Uuid,
    ip: Option<&str>,
    caps: &WorkerCapabilities,
    owner_id: Option<&str>,
    auth_token: Option<&str>,
    now: f64,
) -> Result<(), StoreError> {
    let caps_json = serde_json::to_string(caps).map_err(|e| StoreError::Mapping(e.to_string()))?;
    conn.execute(
        "INSERT INTO workers (id, owner_id, ip, caps_json, status, auth_token, last_heartbeat) \
         VALUES (?1, ?2, ?3, ?4, 'idle', ?5, ?6) \
         ON CONFLICT(id) DO UPDATE SET \
             owner_id = excluded.owner_id, \
             ip = excluded.ip, \
             caps_json = excluded.caps_json, \
             status = 'idle', \
             auth_token = excluded.auth_token, \
             last_heartbeat = excluded.last_heartbeat",
        params![id.to_string(), owner_id, ip, caps_json, auth_token, now],
    )
    .await?;
    Ok(())
}

pub(crate) async fn set_status(
    conn: &Connection,
    id: Uuid,
    status: WorkerStatus,
) -> Result<(), StoreError> {
    conn.execute(
        "UPDATE workers SET status = ?1 WHERE id = ?2",
        params![status.as_str(), id.to_string()],
    )
    .await?;
    Ok(())
}

pub(crate) async fn update_heartbeat(conn: &Connection, id: Uuid, now: f64) -> Result<(), StoreError> {
    conn.execute(
        "UPDATE workers SET last_heartbeat = ?1 WHERE id = ?2",
        params![now, id.to_string()],
    )
    .await?;
    Ok(())
}

pub(crate) async fn get(conn: &Connection, id: Uuid) -> Result<Option<Worker>, StoreError> {
    let sql = format!("SELECT {COLUMNS} FROM workers WHERE id = ?1");
    let mut rows = conn.query(&sql, params![id.to_string()]).await?;
    match rows.next().await? {
        Some(row) => Ok(Some(row_to_worker(&row)?)),
        None => Ok(None),
    }
}

pub(crate) async fn list(conn: &Connection) -> Result<Vec<Worker>, StoreError> {
    let sql = format!("SELECT {COLUMNS} FROM workers ORDER BY id");
    let mut rows = conn.query(&sql, ()).await?;
    let mut workers = Vec::new();
    while let Some(row) = rows.next().await? {
        workers.push(row_to_worker(&row)?);
    }
    Ok(workers)
}

/// Finds an existing worker row owned by `owner_id` carrying exactly
/// `auth_token`, used by the hello reconnect rule (§4.4 rule 2).
pub(crate) async fn find_by_owner_and_token(
    conn: &Connection,
    owner_id: &str,
    auth_token: &str,
) -> Result<Option<Uuid>, StoreError> {
    let mut rows = conn
        .query(
            "SELECT id FROM workers WHERE owner_id = ?1 AND auth_token = ?2 LIMIT 1",
            params![owner_id, auth_token],
        )
        .await?;
    match rows.next().await? {
        Some(row) => {
            let raw: String = row.get(0)?;
            Ok(Some(Uuid::parse_str(&raw).map_err(|e| StoreError::Mapping(e.to_string()))?))
        }
        None => Ok(None),
    }
}

fn row_to_worker(row: &Row) -> Result<Worker, StoreError> {
    let id: String = row.get(0)?;
    let owner_id: Option<String> = row.get(1)?;
    let ip: Option<String> = row.get(2)?;
    let caps_json: String = row.get(3)?;
    let status: String = row.get(4)?;
    let auth_token: Option<String> = row.get(5)?;
    let last_heartbeat: Option<f64> = row.get(6)?;
    let jobs_completed: i64 = row.get(7)?;

    Ok(Worker {
        id: Uuid::parse_str(&id).map_err(|e| StoreError::Mapping(e.to_string()))?,
        owner_id,
        ip,
        caps: WorkerCapabilities::from_json_or_default(&caps_json),
        status: WorkerStatus::parse(&status)
            .ok_or_else(|| StoreError::Mapping(format!("unknown worker status {status}")))?,
        auth_token,
        last_heartbeat,
        jobs_completed,
    })
}
