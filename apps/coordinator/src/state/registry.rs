//! The Worker Registry (§4.2): a process-local, in-memory-only table from
//! worker-id to live session handle. Guarded by a single `RwLock`; every
//! method here is synchronous and touches no I/O, so the lock never spans
//! a suspension point (§5).

use std::sync::RwLock;

use gridx_domain_models::message::ServerMessage;
use gridx_domain_models::worker::{RegistryEntry, WorkerCapabilities, WorkerStatus};
use indexmap::IndexMap;
use tokio::sync::mpsc;
use uuid::Uuid;

pub type SessionHandle = mpsc::UnboundedSender<ServerMessage>;

/// Insertion-ordered so `pick_idle` can honor "first (insertion-ordered)
/// idle entry" from §4.2 without an extra timestamp comparison.
pub struct WorkerRegistry {
    entries: RwLock<IndexMap<Uuid, RegistryEntry<SessionHandle>>>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self { entries: RwLock::new(IndexMap::new()) }
    }

    pub fn register(
        &self,
        worker_id: Uuid,
        session: SessionHandle,
        caps: WorkerCapabilities,
        owner_id: String,
        now: f64,
    ) {
        let mut entries = self.entries.write().expect("registry lock poisoned");
        entries.insert(
            worker_id,
            RegistryEntry {
                worker_id,
                session,
                caps,
                status: WorkerStatus::Idle,
                owner_id,
                last_seen: now,
            },
        );
    }

    /// Removes the entry, returning it so the caller (session teardown) can
    /// still read its owner-id/status for logging after it's gone.
    pub fn unregister(&self, worker_id: Uuid) -> Option<RegistryEntry<SessionHandle>> {
        let mut entries = self.entries.write().expect("registry lock poisoned");
        entries.shift_remove(&worker_id)
    }

    pub fn mark_busy(&self, worker_id: Uuid) {
        self.set_status(worker_id, WorkerStatus::Busy);
    }

    pub fn mark_idle(&self, worker_id: Uuid) {
        self.set_status(worker_id, WorkerStatus::Idle);
    }

    fn set_status(&self, worker_id: Uuid, status: WorkerStatus) {
        let mut entries = self.entries.write().expect("registry lock poisoned");
        if let Some(entry) = entries.get_mut(&worker_id) {
            entry.status = status;
        }
    }

    pub fn touch(&self, worker_id: Uuid, now: f64) {
        let mut entries = self.entries.write().expect("registry lock poisoned");
        if let Some(entry) = entries.get_mut(&worker_id) {
            entry.last_seen = now;
        }
    }

    pub fn contains(&self, worker_id: Uuid) -> bool {
        let entries = self.entries.read().expect("registry lock poisoned");
        entries.contains_key(&worker_id)
    }

    /// First insertion-ordered idle entry with `caps.can_execute`, skipping
    /// any entry owned by `exclude_owner` when it is non-empty (§4.2 — this
    /// is the anti-self-dealing rule, P3).
    pub fn pick_idle(&self, exclude_owner: &str) -> Option<Uuid> {
        let entries = self.entries.read().expect("registry lock poisoned");
        entries
            .values()
            .find(|entry| {
                entry.status == WorkerStatus::Idle
                    && entry.caps.can_execute
                    && (exclude_owner.is_empty() || entry.owner_id != exclude_owner)
            })
            .map(|entry| entry.worker_id)
    }

    pub fn session_of(&self, worker_id: Uuid) -> Option<SessionHandle> {
        let entries = self.entries.read().expect("registry lock poisoned");
        entries.get(&worker_id).map(|entry| entry.session.clone())
    }

    pub fn owner_of(&self, worker_id: Uuid) -> Option<String> {
        let entries = self.entries.read().expect("registry lock poisoned");
        entries.get(&worker_id).map(|entry| entry.owner_id.clone())
    }

    /// `(total, idle)` counts for `GET /status`.
    pub fn counts(&self) -> (usize, usize) {
        let entries = self.entries.read().expect("registry lock poisoned");
        let idle = entries.values().filter(|entry| entry.status == WorkerStatus::Idle).count();
        (entries.len(), idle)
    }
}

impl Default for WorkerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle() -> SessionHandle {
        let (sender, _receiver) = mpsc::unbounded_channel();
        sender
    }

    #[test]
    fn pick_idle_skips_excluded_owner_but_finds_the_next() {
        let registry = WorkerRegistry::new();
        let alice_worker = Uuid::new_v4();
        let bob_worker = Uuid::new_v4();

        registry.register(alice_worker, handle(), WorkerCapabilities::default(), "alice".into(), 0.0);
        registry.register(bob_worker, handle(), WorkerCapabilities::default(), "bob".into(), 0.0);

        assert_eq!(registry.pick_idle("alice"), Some(bob_worker));
        assert_eq!(registry.pick_idle(""), Some(alice_worker));
    }

    #[test]
    fn pick_idle_returns_none_when_only_excluded_owner_is_idle() {
        let registry = WorkerRegistry::new();
        let alice_worker = Uuid::new_v4();
        registry.register(alice_worker, handle(), WorkerCapabilities::default(), "alice".into(), 0.0);

        assert_eq!(registry.pick_idle("alice"), None);
    }

    #[test]
    fn pick_idle_skips_workers_that_cannot_execute() {
        let registry = WorkerRegistry::new();
        let worker_id = Uuid::new_v4();
        let caps = WorkerCapabilities { cpu_cores: None, gpu_count: None, can_execute: false };
        registry.register(worker_id, handle(), caps, "bob".into(), 0.0);

        assert_eq!(registry.pick_idle(""), None);
    }

    #[test]
    fn unregister_removes_the_entry() {
        let registry = WorkerRegistry::new();
        let worker_id = Uuid::new_v4();
        registry.register(worker_id, handle(), WorkerCapabilities::default(), "bob".into(), 0.0);
        assert!(registry.unregister(worker_id).is_some());
        assert!(!registry.contains(worker_id));
    }
}
