//! The Watchdog (§4.6): periodically sweeps running jobs whose worker has
//! no live session and whose last heartbeat is stale, and requeues them.
//! Grounded in the teacher's `spawn_reaper` daemon shape — a `tokio::spawn`
//! wrapping a `tokio::time::interval` loop that logs and keeps going on
//! error rather than ever terminating.

use std::time::Duration;

use gridx_domain_models::worker::WorkerStatus;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, instrument, warn};

use crate::services::scheduler;
use crate::state::{now, AppState};

pub fn spawn(state: AppState) {
    let check_interval = Duration::from_secs(state.config.watchdog_check_interval_seconds);
    let heartbeat_timeout = state.config.watchdog_heartbeat_timeout_seconds as f64;

    tokio::spawn(async move {
        let mut ticker = interval(check_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            sweep(&state, heartbeat_timeout).await;
        }
    });
}

#[instrument(skip(state))]
async fn sweep(state: &AppState, heartbeat_timeout: f64) {
    let running = match state.store.list_running_jobs().await {
        Ok(jobs) => jobs,
        Err(err) => {
            warn!(%err, "watchdog: failed to list running jobs");
            return;
        }
    };

    let mut requeued = 0usize;
    for job in running {
        let Some(worker_id) = job.worker_id else { continue };

        if state.registry.contains(worker_id) {
            continue;
        }

        let stale = match state.store.get_worker(worker_id).await {
            Ok(Some(worker)) => match worker.last_heartbeat {
                Some(last) => now() - last > heartbeat_timeout,
                None => true,
            },
            Ok(None) => true,
            Err(err) => {
                warn!(%worker_id, %err, "watchdog: failed to load worker");
                continue;
            }
        };

        if !stale {
            continue;
        }

        if let Err(err) = state.store.set_worker_status(worker_id, WorkerStatus::Offline).await {
            warn!(%worker_id, %err, "watchdog: failed to mark worker offline");
            continue;
        }

        if let Err(err) = state.store.reset_job_to_queued(job.id).await {
            warn!(job_id = %job.id, %err, "watchdog: failed to requeue job");
            continue;
        }

        state.queue.enqueue(job.id);
        requeued += 1;
    }

    if requeued > 0 {
        info!(requeued, "watchdog: requeued jobs from dead workers");
        scheduler::dispatch(state).await;
    }
}
