//! The worker-channel wire protocol (§4.4). Every frame is a UTF-8 JSON
//! object tagged by `type`; unknown tags are rejected at decode time but the
//! session ignores the decode failure rather than closing, for forward
//! compatibility (§9).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::worker::WorkerCapabilities;

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Hello {
        #[serde(default)]
        worker_id: Option<Uuid>,
        #[serde(default)]
        caps: WorkerCapabilities,
        #[serde(default)]
        owner_id: String,
        #[serde(default)]
        auth_token: String,
    },
    Hb,
    JobStarted {
        job_id: Uuid,
    },
    JobLog {
        job_id: Uuid,
        stream: LogStream,
        chunk: String,
    },
    JobResult {
        job_id: Uuid,
        exit_code: i64,
        #[serde(default)]
        stdout: String,
        #[serde(default)]
        stderr: String,
        #[serde(default)]
        duration_seconds: Option<f64>,
    },
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogStream {
    Stdout,
    Stderr,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    HelloAck {
        worker_id: Uuid,
    },
    AuthError {
        error: String,
    },
    AssignJob {
        job_id: Uuid,
        kind: String,
        payload: AssignJobPayload,
        limits: AssignJobLimits,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct AssignJobPayload {
    pub script: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssignJobLimits {
    pub cpus: u32,
    pub memory: String,
    pub timeout_s: i64,
}
