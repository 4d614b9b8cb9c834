//! The Worker Session state machine (§4.4): `AwaitHello -> Authenticated ->
//! (idle <-> busy) -> Closed`. Grounded in the teacher's
//! `handlers/stream.rs` downstream/upstream split, trimmed to two tasks —
//! there is no need for a third internal command-routing task here, since
//! inbound messages are dispatched straight into Store/Registry/Scheduler
//! calls from the read loop.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use gridx_domain_models::auth::AuthCheck;
use gridx_domain_models::message::{ClientMessage, ServerMessage};
use gridx_domain_models::worker::WorkerCapabilities;
use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::services::scheduler;
use crate::state::{now, AppState};

const PING_INTERVAL_SECONDS: u64 = 20;
const AUTH_FAILED_CLOSE_CODE: u16 = 4401;

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before the unix epoch")
        .as_millis() as i64
}

/// Entry point for an accepted `/ws/worker` upgrade. Runs the whole session
/// lifecycle to completion; returns once the connection is fully torn down.
pub async fn run(mut socket: WebSocket, state: AppState) {
    let Some((worker_id, caps, owner_id)) = await_hello(&mut socket, &state).await else {
        return;
    };

    let (sink, stream) = socket.split();
    let (sender, receiver) = mpsc::unbounded_channel::<ServerMessage>();
    let last_pong_millis = Arc::new(AtomicI64::new(now_millis()));

    state.registry.register(worker_id, sender, caps, owner_id, now());
    info!(%worker_id, "worker session authenticated");
    scheduler::dispatch(&state).await;

    let mut write_task = tokio::spawn(write_loop(sink, receiver, last_pong_millis.clone()));
    let mut read_task = tokio::spawn(read_loop(stream, state.clone(), worker_id, last_pong_millis));

    tokio::select! {
        _ = &mut write_task => { read_task.abort(); }
        _ = &mut read_task => { write_task.abort(); }
    }

    teardown(&state, worker_id).await;
}

/// Reads messages until a `hello` is seen (or the socket closes first),
/// applying the §4.4 decision table. Runs on the unsplit socket: nothing
/// else needs to send or receive concurrently before authentication.
async fn await_hello(
    socket: &mut WebSocket,
    state: &AppState,
) -> Option<(Uuid, WorkerCapabilities, String)> {
    while let Some(Ok(message)) = socket.recv().await {
        let Message::Text(text) = message else {
            if matches!(message, Message::Close(_)) {
                return None;
            }
            continue;
        };

        match serde_json::from_str::<ClientMessage>(&text) {
            Ok(ClientMessage::Hello { worker_id, caps, owner_id, auth_token }) => {
                return process_hello(socket, state, worker_id, caps, owner_id, auth_token).await;
            }
            // Steady-state rule applies during AwaitHello too: anything
            // that isn't a recognized hello is silently ignored.
            _ => continue,
        }
    }
    None
}

#[instrument(skip(socket, state, caps, auth_token))]
async fn process_hello(
    socket: &mut WebSocket,
    state: &AppState,
    worker_id: Option<Uuid>,
    caps: WorkerCapabilities,
    owner_id: String,
    auth_token: String,
) -> Option<(Uuid, WorkerCapabilities, String)> {
    if owner_id.is_empty() || auth_token.is_empty() {
        if state.config.allow_unauthenticated_hello {
            let canonical_id = worker_id.unwrap_or_else(Uuid::new_v4);
            return accept(socket, state, canonical_id, caps, owner_id, auth_token).await;
        }
        reject(socket, "authentication required").await;
        return None;
    }

    let canonical_id = match state.store.check_user_auth(&owner_id, &auth_token).await {
        Ok(AuthCheck::Mismatch) => {
            warn!(%owner_id, "hello rejected: auth token mismatch");
            reject(socket, "invalid credentials").await;
            return None;
        }
        Ok(AuthCheck::NewUser) => {
            if let Err(err) = state.store.register_user_auth(&owner_id, &auth_token).await {
                warn!(%owner_id, %err, "failed to register new user auth");
            }
            worker_id.unwrap_or_else(Uuid::new_v4)
        }
        Ok(AuthCheck::Match) => match state.store.get_worker_by_auth(&owner_id, &auth_token).await {
            Ok(Some(existing_id)) => existing_id,
            Ok(None) => worker_id.unwrap_or_else(Uuid::new_v4),
            Err(err) => {
                warn!(%owner_id, %err, "failed to look up existing worker for reconnect");
                worker_id.unwrap_or_else(Uuid::new_v4)
            }
        },
        Err(err) => {
            warn!(%owner_id, %err, "auth check failed");
            reject(socket, "internal error").await;
            return None;
        }
    };

    accept(socket, state, canonical_id, caps, owner_id, auth_token).await
}

async fn accept(
    socket: &mut WebSocket,
    state: &AppState,
    canonical_id: Uuid,
    caps: WorkerCapabilities,
    owner_id: String,
    auth_token: String,
) -> Option<(Uuid, WorkerCapabilities, String)> {
    if let Err(err) = state
        .store
        .upsert_worker(
            canonical_id,
            None,
            &caps,
            Some(&owner_id).filter(|o| !o.is_empty()),
            Some(&auth_token).filter(|t| !t.is_empty()),
        )
        .await
    {
        warn!(%canonical_id, %err, "failed to upsert worker row on hello");
        reject(socket, "internal error").await;
        return None;
    }

    let ack = ServerMessage::HelloAck { worker_id: canonical_id };
    let Ok(text) = serde_json::to_string(&ack) else { return None };
    if socket.send(Message::Text(text)).await.is_err() {
        return None;
    }

    Some((canonical_id, caps, owner_id))
}

async fn reject(socket: &mut WebSocket, reason: &str) {
    let error = ServerMessage::AuthError { error: reason.to_string() };
    if let Ok(text) = serde_json::to_string(&error) {
        let _ = socket.send(Message::Text(text)).await;
    }
    let _ = socket
        .send(Message::Close(Some(CloseFrame {
            code: AUTH_FAILED_CLOSE_CODE,
            reason: reason.to_string().into(),
        })))
        .await;
}

async fn write_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::UnboundedReceiver<ServerMessage>,
    last_pong_millis: Arc<AtomicI64>,
) {
    let mut ticker = interval(Duration::from_secs(PING_INTERVAL_SECONDS));

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let silence_ms = now_millis() - last_pong_millis.load(Ordering::Relaxed);
                if silence_ms > (PING_INTERVAL_SECONDS as i64) * 1000 {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
                if sink.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
            outgoing = outbound.recv() => {
                match outgoing {
                    Some(message) => {
                        let Ok(text) = serde_json::to_string(&message) else { continue };
                        if sink.send(Message::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
        }
    }
}

async fn read_loop(
    mut stream: SplitStream<WebSocket>,
    state: AppState,
    worker_id: Uuid,
    last_pong_millis: Arc<AtomicI64>,
) {
    while let Some(Ok(message)) = stream.next().await {
        match message {
            Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_message) => handle_message(&state, worker_id, client_message).await,
                // Unknown/malformed tag: ignored rather than closing the
                // session, for forward compatibility (§9).
                Err(_) => {}
            },
            Message::Pong(_) => last_pong_millis.store(now_millis(), Ordering::Relaxed),
            Message::Close(_) => break,
            _ => {}
        }
    }
}

async fn handle_message(state: &AppState, worker_id: Uuid, message: ClientMessage) {
    state.registry.touch(worker_id, now());
    if let Err(err) = state.store.update_heartbeat(worker_id).await {
        warn!(%worker_id, %err, "failed to persist heartbeat");
    }

    match message {
        // A second hello on an already-authenticated connection is a no-op
        // beyond the touch above.
        ClientMessage::Hello { .. } | ClientMessage::Hb => {}
        ClientMessage::JobStarted { job_id } => scheduler::on_started(state, job_id).await,
        // Acknowledged and discarded (§4.4/§9) — log persistence is a
        // conscious non-goal.
        ClientMessage::JobLog { .. } => {}
        ClientMessage::JobResult { job_id, exit_code, stdout, stderr, duration_seconds } => {
            scheduler::on_result(state, job_id, worker_id, exit_code, &stdout, &stderr, duration_seconds).await;
        }
    }
}

#[instrument(skip(state))]
async fn teardown(state: &AppState, worker_id: Uuid) {
    state.registry.unregister(worker_id);
    if let Err(err) = state.store.set_worker_offline(worker_id).await {
        warn!(%worker_id, %err, "teardown: failed to mark worker offline");
    }

    match state.store.requeue_running_jobs_for_worker(worker_id).await {
        Ok(job_ids) => {
            let count = job_ids.len();
            for job_id in job_ids {
                state.queue.enqueue(job_id);
            }
            info!(%worker_id, count, "teardown: requeued orphaned jobs");
            if count > 0 {
                scheduler::dispatch(state).await;
            }
        }
        Err(err) => warn!(%worker_id, %err, "teardown: failed to requeue orphaned jobs"),
    }
}
