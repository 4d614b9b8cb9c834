//! Time-based credit reservation and settlement engine (§4.3).
//!
//! Credits are spent per second of compute: submitters reserve the maximum
//! possible charge at submit time, and the difference between that reserve
//! and the job's actual cost is refunded at settlement, with a fraction of
//! the actual cost rewarded to the worker's owner.

pub mod config;
pub mod engine;

pub use config::{ConfigError, CreditEngineConfig};
pub use engine::{CreditEngine, CreditEngineError, SettlementOutcome};
