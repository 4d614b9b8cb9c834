//! Application state: the composition root that wires the Store, the
//! Credit Engine, the Worker Registry, and the Job Queue together behind
//! one `Clone`-able handle, grounded in the teacher's `AppState` pattern of
//! `Arc`-wrapped managers injected at construction time.

pub mod queue;
pub mod registry;

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use gridx_credit_engine::CreditEngine;
use gridx_infra_store::Store;
use tokio::sync::Mutex as AsyncMutex;

use crate::config::CoordinatorConfig;
use queue::JobQueue;
use registry::WorkerRegistry;

pub fn now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before the unix epoch")
        .as_secs_f64()
}

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub credit_engine: CreditEngine,
    pub registry: Arc<WorkerRegistry>,
    pub queue: Arc<JobQueue>,
    pub config: Arc<CoordinatorConfig>,
    /// Serializes `dispatch()` invocations (§4.5): the one mutex in the
    /// system explicitly allowed to span suspension points, because
    /// non-reentrancy of the whole assignment loop is its entire purpose.
    pub dispatch_lock: Arc<AsyncMutex<()>>,
}

impl AppState {
    pub fn new(store: Store, credit_engine: CreditEngine, config: CoordinatorConfig) -> Self {
        Self {
            store,
            credit_engine,
            registry: Arc::new(WorkerRegistry::new()),
            queue: Arc::new(JobQueue::new()),
            config: Arc::new(config),
            dispatch_lock: Arc::new(AsyncMutex::new(())),
        }
    }
}
