//! The durable Store (§4.1). A single `libsql::Connection` behind one
//! `tokio::sync::Mutex`: every call serializes through one awaited lock
//! acquisition, which satisfies "a single writer lock or equivalent
//! serialization is sufficient" without pooling multiple connections.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use gridx_domain_models::auth::AuthCheck;
use gridx_domain_models::credit::UserCredits;
use gridx_domain_models::job::{Job, JobLimits, Language};
use gridx_domain_models::worker::{Worker, WorkerCapabilities, WorkerStatus};
use libsql::{Builder, Connection, Database};
use tokio::sync::Mutex;
use tracing::instrument;
use uuid::Uuid;

use crate::errors::StoreError;
use crate::repositories::{auth, credits, jobs, workers};
use crate::schema;

pub(crate) fn now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before the unix epoch")
        .as_secs_f64()
}

#[derive(Clone)]
pub struct Store {
    // Kept alive for the lifetime of the store; local on-disk and in-memory
    // databases are otherwise dropped as soon as the last Connection is.
    _database: Arc<Database>,
    connection: Arc<Mutex<Connection>>,
}

impl Store {
    /// `path` may be a local file path, `:memory:`, or a `libsql://`/`https://`
    /// remote URL — in the latter case `auth_token` is required.
    #[instrument(skip(auth_token))]
    pub async fn connect(path: &str, auth_token: Option<String>) -> Result<Self, StoreError> {
        let is_remote = path.starts_with("libsql://") || path.starts_with("https://");

        let database = if is_remote {
            let token = auth_token
                .ok_or_else(|| StoreError::Connection("remote store requires an auth token".into()))?;
            Builder::new_remote(path.to_string(), token)
                .build()
                .await
                .map_err(|e| StoreError::Connection(e.to_string()))?
        } else {
            Builder::new_local(path)
                .build()
                .await
                .map_err(|e| StoreError::Connection(e.to_string()))?
        };

        let connection = database
            .connect()
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        schema::apply(&connection).await?;

        Ok(Self {
            _database: Arc::new(database),
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    // ---- jobs ----

    pub async fn create_job(
        &self,
        id: Uuid,
        submitter_id: &str,
        code: &str,
        language: Language,
        limits: &JobLimits,
        reserved_cost: f64,
    ) -> Result<(), StoreError> {
        let conn = self.connection.lock().await;
        jobs::create_job(&conn, id, submitter_id, code, language, limits, reserved_cost, now()).await
    }

    pub async fn get_job(&self, id: Uuid) -> Result<Option<Job>, StoreError> {
        let conn = self.connection.lock().await;
        jobs::get_job(&conn, id).await
    }

    pub async fn list_jobs_by_submitter(
        &self,
        submitter_id: &str,
        limit: i64,
    ) -> Result<Vec<Job>, StoreError> {
        let conn = self.connection.lock().await;
        jobs::list_jobs_by_submitter(&conn, submitter_id, limit).await
    }

    pub async fn mark_job_started(&self, id: Uuid) -> Result<(), StoreError> {
        let conn = self.connection.lock().await;
        jobs::mark_started(&conn, id, now()).await
    }

    pub async fn assign_job_to_worker(&self, job_id: Uuid, worker_id: Uuid) -> Result<bool, StoreError> {
        let conn = self.connection.lock().await;
        jobs::assign_to_worker(&conn, job_id, worker_id, now()).await
    }

    pub async fn reset_job_to_queued(&self, job_id: Uuid) -> Result<(), StoreError> {
        let conn = self.connection.lock().await;
        jobs::reset_to_queued(&conn, job_id).await
    }

    pub async fn complete_job(
        &self,
        job_id: Uuid,
        worker_id: Uuid,
        stdout: &str,
        stderr: &str,
        exit_code: i64,
    ) -> Result<(), StoreError> {
        let conn = self.connection.lock().await;
        jobs::complete(&conn, job_id, worker_id, stdout, stderr, exit_code, now()).await
    }

    pub async fn record_settlement(
        &self,
        job_id: Uuid,
        actual_cost: f64,
        duration_seconds: Option<f64>,
    ) -> Result<(), StoreError> {
        let conn = self.connection.lock().await;
        jobs::record_settlement(&conn, job_id, actual_cost, duration_seconds).await
    }

    pub async fn requeue_running_jobs_for_worker(&self, worker_id: Uuid) -> Result<Vec<Uuid>, StoreError> {
        let conn = self.connection.lock().await;
        jobs::requeue_running_for_worker(&conn, worker_id).await
    }

    pub async fn list_running_jobs(&self) -> Result<Vec<Job>, StoreError> {
        let conn = self.connection.lock().await;
        jobs::list_running(&conn).await
    }

    // ---- workers ----

    pub async fn upsert_worker(
        &self,
        id: Uuid,
        ip: Option<&str>,
        caps: &WorkerCapabilities,
        owner_id: Option<&str>,
        auth_token: Option<&str>,
    ) -> Result<(), StoreError> {
        let conn = self.connection.lock().await;
        workers::upsert(&conn, id, ip, caps, owner_id, auth_token, now()).await
    }

    pub async fn set_worker_status(&self, id: Uuid, status: WorkerStatus) -> Result<(), StoreError> {
        let conn = self.connection.lock().await;
        workers::set_status(&conn, id, status).await
    }

    pub async fn set_worker_offline(&self, id: Uuid) -> Result<(), StoreError> {
        let conn = self.connection.lock().await;
        workers::set_status(&conn, id, WorkerStatus::Offline).await
    }

    pub async fn update_heartbeat(&self, id: Uuid) -> Result<(), StoreError> {
        let conn = self.connection.lock().await;
        workers::update_heartbeat(&conn, id, now()).await
    }

    pub async fn get_worker(&self, id: Uuid) -> Result<Option<Worker>, StoreError> {
        let conn = self.connection.lock().await;
        workers::get(&conn, id).await
    }

    pub async fn list_workers(&self) -> Result<Vec<Worker>, StoreError> {
        let conn = self.connection.lock().await;
        workers::list(&conn).await
    }

    pub async fn get_worker_by_auth(
        &self,
        owner_id: &str,
        auth_token: &str,
    ) -> Result<Option<Uuid>, StoreError> {
        let conn = self.connection.lock().await;
        workers::find_by_owner_and_token(&conn, owner_id, auth_token).await
    }

    // ---- credits ----

    pub async fn ensure_user(&self, user_id: &str, initial_balance: f64) -> Result<f64, StoreError> {
        let conn = self.connection.lock().await;
        credits::ensure_user(&conn, user_id, initial_balance, now()).await
    }

    pub async fn get_balance(&self, user_id: &str) -> Result<f64, StoreError> {
        let conn = self.connection.lock().await;
        credits::get_balance(&conn, user_id).await
    }

    pub async fn get_user_credits(&self, user_id: &str) -> Result<Option<UserCredits>, StoreError> {
        let conn = self.connection.lock().await;
        credits::get(&conn, user_id).await
    }

    pub async fn deduct(&self, user_id: &str, amount: f64) -> Result<bool, StoreError> {
        let conn = self.connection.lock().await;
        credits::deduct(&conn, user_id, amount, now()).await
    }

    pub async fn credit(&self, user_id: &str, amount: f64) -> Result<(), StoreError> {
        let conn = self.connection.lock().await;
        credits::credit(&conn, user_id, amount, now()).await
    }

    // ---- auth ----

    pub async fn check_user_auth(&self, user_id: &str, auth_token: &str) -> Result<AuthCheck, StoreError> {
        let conn = self.connection.lock().await;
        auth::check(&conn, user_id, auth_token).await
    }

    pub async fn register_user_auth(&self, user_id: &str, auth_token: &str) -> Result<(), StoreError> {
        let conn = self.connection.lock().await;
        auth::register(&conn, user_id, auth_token, now()).await
    }
}
