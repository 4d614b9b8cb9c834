//! The Scheduler (§4.5): owns the dispatcher loop that pairs queued jobs
//! with idle workers, and the two result-driven transitions
//! (`on_started`/`on_result`) that a Worker Session calls into.

use gridx_domain_models::job::JobStatus;
use gridx_domain_models::message::{AssignJobLimits, AssignJobPayload, ServerMessage};
use gridx_domain_models::worker::WorkerStatus;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::state::AppState;

/// Runs the pairing loop until the queue is drained or the head-of-queue
/// job cannot be placed. Non-reentrant: serialized by `state.dispatch_lock`
/// for the whole call, including every awaited Store/session send (§4.5
/// AMBIENT — the one mutex allowed to span suspension points).
#[instrument(skip(state))]
pub async fn dispatch(state: &AppState) {
    let _guard = state.dispatch_lock.lock().await;

    loop {
        let job_id = match state.queue.dequeue() {
            Some(id) => id,
            None => return,
        };

        if let Err(outcome) = try_assign(state, job_id).await {
            match outcome {
                AssignOutcome::RequeueAndStop => {
                    state.queue.enqueue(job_id);
                    return;
                }
                AssignOutcome::AlreadyHandled => continue,
            }
        }
    }
}

enum AssignOutcome {
    /// No eligible idle worker, or the send to the worker failed: put the
    /// job back at the tail and stop this tick (§9 open question — this
    /// preserves the source's head-of-queue-blocks behavior).
    RequeueAndStop,
    /// The job no longer needs dispatching (gone, already running, or lost
    /// the CAS race to another dispatch): move on to the next queued job.
    AlreadyHandled,
}

async fn try_assign(state: &AppState, job_id: Uuid) -> Result<(), AssignOutcome> {
    let job = match state.store.get_job(job_id).await {
        Ok(Some(job)) => job,
        Ok(None) => {
            warn!(%job_id, "dispatch: job not found in store");
            return Err(AssignOutcome::AlreadyHandled);
        }
        Err(err) => {
            warn!(%job_id, %err, "dispatch: failed to load job");
            return Err(AssignOutcome::AlreadyHandled);
        }
    };

    if job.status != JobStatus::Queued {
        return Err(AssignOutcome::AlreadyHandled);
    }

    let idle_worker_id = match state.registry.pick_idle(&job.submitter_id) {
        Some(id) => id,
        None => {
            return Err(AssignOutcome::RequeueAndStop);
        }
    };

    state.registry.mark_busy(idle_worker_id);
    if let Err(err) = state.store.set_worker_status(idle_worker_id, WorkerStatus::Busy).await {
        warn!(%idle_worker_id, %err, "dispatch: failed to mark worker busy in store");
    }

    let assigned = state.store.assign_job_to_worker(job_id, idle_worker_id).await.unwrap_or_else(|err| {
        warn!(%job_id, %idle_worker_id, %err, "dispatch: CAS-assign failed");
        false
    });

    if !assigned {
        revert_worker_to_idle(state, idle_worker_id).await;
        return Err(AssignOutcome::AlreadyHandled);
    }

    let timeout_seconds = job
        .limits
        .timeout_seconds
        .filter(|t| *t > 0)
        .unwrap_or(state.credit_engine.config().default_job_timeout_seconds);
    let memory = job.limits.memory.map(|mb| format!("{mb}m")).unwrap_or_else(|| "256m".to_string());

    let message = ServerMessage::AssignJob {
        job_id,
        kind: job.language.as_str().to_string(),
        payload: AssignJobPayload { script: job.code.clone() },
        limits: AssignJobLimits { cpus: job.limits.cpus.unwrap_or(1), memory, timeout_s: timeout_seconds },
    };

    let send_ok = state
        .registry
        .session_of(idle_worker_id)
        .map(|session| session.send(message).is_ok())
        .unwrap_or(false);

    if !send_ok {
        revert_worker_to_idle(state, idle_worker_id).await;
        if let Err(err) = state.store.reset_job_to_queued(job_id).await {
            warn!(%job_id, %err, "dispatch: failed to reset job after send failure");
        }
        return Err(AssignOutcome::RequeueAndStop);
    }

    info!(%job_id, %idle_worker_id, "dispatch: assigned job to worker");
    Ok(())
}

async fn revert_worker_to_idle(state: &AppState, worker_id: Uuid) {
    state.registry.mark_idle(worker_id);
    if let Err(err) = state.store.set_worker_status(worker_id, WorkerStatus::Idle).await {
        warn!(%worker_id, %err, "dispatch: failed to revert worker status after assign failure");
    }
}

/// A worker reported it started executing `job_id`: stamp `started_at` if
/// it hasn't been set already (CAS-assign already does this, so this is
/// idempotent bookkeeping for the common case where `job_started` arrives
/// after the assign).
#[instrument(skip(state))]
pub async fn on_started(state: &AppState, job_id: Uuid) {
    if let Err(err) = state.store.mark_job_started(job_id).await {
        warn!(%job_id, %err, "on_started: failed to stamp started_at");
    }
}

/// A worker reported a result for `job_id` (§4.5 on_result). `worker_id`
/// must be the session's authoritative id, never a value trusted from the
/// payload (§4.4).
#[instrument(skip(state, stdout, stderr))]
pub async fn on_result(
    state: &AppState,
    job_id: Uuid,
    worker_id: Uuid,
    exit_code: i64,
    stdout: &str,
    stderr: &str,
    duration_seconds: Option<f64>,
) {
    // Fall back to the persisted worker row if the registry entry is
    // already gone (teardown raced the result).
    let owner_id = match state.registry.owner_of(worker_id) {
        Some(owner) => Some(owner),
        None => state.store.get_worker(worker_id).await.ok().flatten().and_then(|w| w.owner_id),
    };

    match state.credit_engine.settle(job_id, owner_id.as_deref(), duration_seconds).await {
        Ok(outcome) => info!(%job_id, ?outcome, "on_result: settled job"),
        Err(err) => warn!(%job_id, %err, "on_result: settlement failed"),
    }

    if let Err(err) = state.store.complete_job(job_id, worker_id, stdout, stderr, exit_code).await {
        warn!(%job_id, %worker_id, %err, "on_result: failed to persist completion");
    }

    state.registry.mark_idle(worker_id);
    if let Err(err) = state.store.set_worker_status(worker_id, WorkerStatus::Idle).await {
        warn!(%worker_id, %err, "on_result: failed to mark worker idle in store");
    }

    dispatch(state).await;
}

#[cfg(test)]
mod tests {
    use gridx_credit_engine::{CreditEngine, CreditEngineConfig};
    use gridx_domain_models::job::{JobLimits, Language};
    use gridx_domain_models::worker::WorkerCapabilities;
    use gridx_infra_store::Store;
    use tokio::sync::mpsc;

    use super::*;
    use crate::config::CoordinatorConfig;

    async fn test_state() -> AppState {
        let store = Store::connect(":memory:", None).await.expect("in-memory store connects");
        let credit_engine = CreditEngine::new(CreditEngineConfig::default(), store.clone());
        let config = CoordinatorConfig {
            http_port: 0,
            ws_port: 0,
            db_path: ":memory:".into(),
            db_auth_token: None,
            allow_unauthenticated_hello: false,
            watchdog_check_interval_seconds: 15,
            watchdog_heartbeat_timeout_seconds: 30,
        };
        AppState::new(store, credit_engine, config)
    }

    fn register_idle_worker(
        state: &AppState,
        worker_id: Uuid,
        owner_id: &str,
    ) -> mpsc::UnboundedReceiver<ServerMessage> {
        let (sender, receiver) = mpsc::unbounded_channel();
        state.registry.register(worker_id, sender, WorkerCapabilities::default(), owner_id.to_string(), 0.0);
        receiver
    }

    async fn submit_job(state: &AppState, submitter: &str) -> Uuid {
        let job_id = Uuid::new_v4();
        state.credit_engine.ensure_user(submitter).await.unwrap();
        let reserved = state.credit_engine.max_reserve(Some(60));
        assert!(state.credit_engine.reserve(submitter, reserved).await.unwrap());
        state
            .store
            .create_job(job_id, submitter, "1+1", Language::Python, &JobLimits::none(), reserved)
            .await
            .unwrap();
        job_id
    }

    /// P3: with only the submitter's own worker idle, the job is left
    /// queued rather than assigned to it.
    #[tokio::test]
    async fn dispatch_blocks_self_dealing() {
        let state = test_state().await;
        let worker_id = Uuid::new_v4();
        let mut inbox = register_idle_worker(&state, worker_id, "alice");

        let job_id = submit_job(&state, "alice").await;
        state.queue.enqueue(job_id);
        dispatch(&state).await;

        let job = state.store.get_job(job_id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Queued);
        assert!(job.worker_id.is_none());
        assert!(inbox.try_recv().is_err());
    }

    /// Happy path: a job is paired with an idle worker owned by someone
    /// else, transitions to running, and the worker receives an assignment.
    #[tokio::test]
    async fn dispatch_assigns_to_eligible_idle_worker() {
        let state = test_state().await;
        let worker_id = Uuid::new_v4();
        let mut inbox = register_idle_worker(&state, worker_id, "bob");

        let job_id = submit_job(&state, "alice").await;
        state.queue.enqueue(job_id);
        dispatch(&state).await;

        let job = state.store.get_job(job_id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Running);
        assert_eq!(job.worker_id, Some(worker_id));

        match inbox.try_recv().expect("worker received an assignment") {
            ServerMessage::AssignJob { job_id: assigned, .. } => assert_eq!(assigned, job_id),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    /// P4: with a single idle worker, the older of two eligible jobs is
    /// assigned first; the younger stays queued for the next tick.
    #[tokio::test]
    async fn dispatch_prefers_older_job_when_only_one_worker_is_idle() {
        let state = test_state().await;
        let worker_id = Uuid::new_v4();
        register_idle_worker(&state, worker_id, "bob");

        let first = submit_job(&state, "alice").await;
        let second = submit_job(&state, "alice").await;
        state.queue.enqueue(first);
        state.queue.enqueue(second);
        dispatch(&state).await;

        let first_job = state.store.get_job(first).await.unwrap().unwrap();
        let second_job = state.store.get_job(second).await.unwrap().unwrap();
        assert_eq!(first_job.status, JobStatus::Running);
        assert_eq!(first_job.worker_id, Some(worker_id));
        assert_eq!(second_job.status, JobStatus::Queued);
    }
}
