use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A code-execution job as submitted by a user.
///
/// `reserved_cost` is set exactly once at creation (I6) and never mutated
/// again; `actual_cost`/`actual_duration_seconds` are filled in by
/// settlement and stay `None` until the job completes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    pub id: Uuid,
    #[serde(rename = "user_id")]
    pub submitter_id: String,
    pub code: String,
    pub language: Language,
    pub status: JobStatus,
    pub worker_id: Option<Uuid>,
    pub created_at: f64,
    pub started_at: Option<f64>,
    pub completed_at: Option<f64>,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i64>,
    pub limits: JobLimits,
    pub reserved_cost: f64,
    pub actual_cost: Option<f64>,
    pub actual_duration_seconds: Option<f64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "queued" => Some(JobStatus::Queued),
            "running" => Some(JobStatus::Running),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            "cancelled" => Some(JobStatus::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    Javascript,
    Node,
    Bash,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::Javascript => "javascript",
            Language::Node => "node",
            Language::Bash => "bash",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "python" => Some(Language::Python),
            "javascript" => Some(Language::Javascript),
            "node" => Some(Language::Node),
            "bash" => Some(Language::Bash),
            _ => None,
        }
    }
}

/// Per-job resource limits. Persisted as an opaque JSON blob (§9): the core
/// only ever reads `timeout_seconds` back out of it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct JobLimits {
    #[serde(default)]
    pub timeout_seconds: Option<i64>,
    #[serde(default)]
    pub cpus: Option<u32>,
    #[serde(default)]
    pub memory: Option<u64>,
}

impl JobLimits {
    pub fn none() -> Self {
        Self { timeout_seconds: None, cpus: None, memory: None }
    }

    /// Parses the persisted JSON blob, defaulting to no limits if the blob
    /// itself is malformed (§9 — limits are an opaque map to the core).
    pub fn from_json_or_default(raw: &str) -> Self {
        serde_json::from_str(raw).unwrap_or_default()
    }
}

impl Default for JobLimits {
    fn default() -> Self {
        Self::none()
    }
}
