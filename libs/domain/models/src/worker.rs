use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Worker {
    pub id: Uuid,
    pub owner_id: Option<String>,
    pub ip: Option<String>,
    pub caps: WorkerCapabilities,
    pub status: WorkerStatus,
    pub auth_token: Option<String>,
    pub last_heartbeat: Option<f64>,
    pub jobs_completed: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WorkerStatus {
    Idle,
    Busy,
    Offline,
}

impl WorkerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerStatus::Idle => "idle",
            WorkerStatus::Busy => "busy",
            WorkerStatus::Offline => "offline",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "idle" => Some(WorkerStatus::Idle),
            "busy" => Some(WorkerStatus::Busy),
            "offline" => Some(WorkerStatus::Offline),
            _ => None,
        }
    }
}

/// Opaque capability map (§9) — the core only reads `can_execute` out of it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct WorkerCapabilities {
    #[serde(default)]
    pub cpu_cores: Option<u32>,
    #[serde(default)]
    pub gpu_count: Option<u32>,
    #[serde(default = "default_can_execute")]
    pub can_execute: bool,
}

fn default_can_execute() -> bool {
    true
}

impl Default for WorkerCapabilities {
    fn default() -> Self {
        Self { cpu_cores: None, gpu_count: None, can_execute: true }
    }
}

impl WorkerCapabilities {
    /// Parses the persisted JSON blob, defaulting `can_execute` to `true`
    /// when the key is absent or the blob itself is malformed.
    pub fn from_json_or_default(raw: &str) -> Self {
        serde_json::from_str(raw).unwrap_or_default()
    }
}

/// In-memory registry entry: worker-id -> live session handle + metadata.
/// Never persisted; (I1) an entry exists iff a session is live for it.
#[derive(Debug, Clone)]
pub struct RegistryEntry<Handle> {
    pub worker_id: Uuid,
    pub session: Handle,
    pub caps: WorkerCapabilities,
    pub status: WorkerStatus,
    pub owner_id: String,
    pub last_seen: f64,
}
