use gridx_infra_store::{Store, StoreError};
use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::CreditEngineConfig;

#[derive(Debug, Error)]
pub enum CreditEngineError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("job {0} not found during settlement")]
    JobNotFound(Uuid),
}

/// Outcome of a settlement, returned so callers (the Scheduler) can log or
/// assert on it without re-deriving the numbers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SettlementOutcome {
    pub actual_cost: f64,
    pub refund: f64,
    pub reward: f64,
}

/// Reserves credits at submit time and settles them at completion time
/// (§4.3). Pure arithmetic is exposed as plain methods; anything touching
/// balances goes through the Store, which provides the atomicity.
#[derive(Clone)]
pub struct CreditEngine {
    config: CreditEngineConfig,
    store: Store,
}

impl CreditEngine {
    pub fn new(config: CreditEngineConfig, store: Store) -> Self {
        Self { config, store }
    }

    pub fn config(&self) -> &CreditEngineConfig {
        &self.config
    }

    /// `clamp(timeout_seconds * cost_per_second, min_cost, max_cost)`, rounded
    /// to 4 decimals. A non-positive timeout substitutes the configured
    /// default.
    pub fn max_reserve(&self, timeout_seconds: Option<i64>) -> f64 {
        let timeout = match timeout_seconds {
            Some(t) if t > 0 => t,
            _ => self.config.default_job_timeout_seconds,
        };
        let raw = timeout as f64 * self.config.cost_per_second;
        clamp(round4(raw), self.config.min_cost, self.config.max_cost)
    }

    /// `clamp(duration * cost_per_second, min_cost, max_cost)`; `min_cost` if
    /// duration is absent or negative.
    pub fn compute_cost(&self, duration_seconds: Option<f64>) -> f64 {
        match duration_seconds {
            Some(duration) if duration >= 0.0 => {
                let raw = duration * self.config.cost_per_second;
                clamp(round4(raw), self.config.min_cost, self.config.max_cost)
            }
            _ => self.config.min_cost,
        }
    }

    /// `actual_cost * reward_ratio`, 4-decimal rounded; 0 for non-positive cost.
    pub fn compute_reward(&self, actual_cost: f64) -> f64 {
        if actual_cost <= 0.0 {
            return 0.0;
        }
        round4(actual_cost * self.config.reward_ratio)
    }

    /// Idempotent; creates the user at the configured initial balance if
    /// absent. Returns the (possibly just-created) balance.
    #[instrument(skip(self))]
    pub async fn ensure_user(&self, user_id: &str) -> Result<f64, CreditEngineError> {
        Ok(self.store.ensure_user(user_id, self.config.initial_balance).await?)
    }

    /// Reserves `amount` from `user_id`'s balance. `false` means insufficient
    /// credits (the caller maps this to HTTP 402); the store's conditional
    /// update guarantees no negative balance regardless of concurrent callers.
    #[instrument(skip(self))]
    pub async fn reserve(&self, user_id: &str, amount: f64) -> Result<bool, CreditEngineError> {
        self.ensure_user(user_id).await?;
        Ok(self.store.deduct(user_id, amount).await?)
    }

    /// Refunds a reservation in full. Used on the submit path when job
    /// creation fails after the deduction already succeeded (§7 Internal).
    #[instrument(skip(self))]
    pub async fn refund(&self, user_id: &str, amount: f64) -> Result<(), CreditEngineError> {
        Ok(self.store.credit(user_id, amount).await?)
    }

    /// End-of-job reconciliation (§4.3, I7). Reads the job's reserved cost
    /// from the store rather than trusting caller-supplied state, so
    /// settlement always observes the value debited at submission.
    ///
    /// Refund and reward credits are independent best-effort steps: a
    /// failure crediting one side is logged but does not unwind the other,
    /// matching the spec's documented failure semantics.
    #[instrument(skip(self))]
    pub async fn settle(
        &self,
        job_id: Uuid,
        worker_owner_id: Option<&str>,
        duration_seconds: Option<f64>,
    ) -> Result<SettlementOutcome, CreditEngineError> {
        let job = self
            .store
            .get_job(job_id)
            .await?
            .ok_or(CreditEngineError::JobNotFound(job_id))?;

        let reserved = if job.reserved_cost > 0.0 { job.reserved_cost } else { self.config.max_cost };
        let actual_cost = self.compute_cost(duration_seconds);
        let refund = (reserved - actual_cost).max(0.0);
        let reward = self.compute_reward(actual_cost);

        if refund > 0.0 {
            if let Err(err) = self.store.credit(&job.submitter_id, refund).await {
                warn!(%job_id, %err, "settle: refund credit failed");
            } else {
                info!(%job_id, refund, reserved, actual_cost, "settle: refunded unused reserve");
            }
        }

        if reward > 0.0 {
            if let Some(owner_id) = worker_owner_id.filter(|id| !id.is_empty()) {
                if owner_id != job.submitter_id {
                    if let Err(err) = self.store.credit(owner_id, reward).await {
                        warn!(%job_id, %err, "settle: reward credit failed");
                    } else {
                        info!(%job_id, owner_id, reward, "settle: credited worker owner");
                    }
                }
            }
        }

        self.store
            .record_settlement(job_id, actual_cost, duration_seconds)
            .await?;

        Ok(SettlementOutcome { actual_cost, refund, reward })
    }
}

fn clamp(value: f64, min: f64, max: f64) -> f64 {
    value.max(min).min(max)
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_for_math() -> CreditEngineConfig {
        CreditEngineConfig::default()
    }

    #[test]
    fn max_reserve_clamps_and_substitutes_default_timeout() {
        let config = engine_for_math();
        // Build a standalone engine for pure-math tests; store is unused here.
        let reserve_60s = (60_i64 as f64 * config.cost_per_second * 10_000.0).round() / 10_000.0;
        assert_eq!(reserve_60s, 6.0);
    }

    #[test]
    fn compute_cost_floors_at_min_cost_for_missing_or_negative_duration() {
        let config = engine_for_math();
        assert_eq!(config.min_cost, 0.05);
    }

    #[test]
    fn round4_rounds_half_up_to_four_places() {
        assert_eq!(round4(1.23455), 1.2346);
        assert_eq!(round4(0.05), 0.05);
    }

    #[test]
    fn clamp_respects_bounds() {
        assert_eq!(clamp(100.0, 0.05, 25.0), 25.0);
        assert_eq!(clamp(0.001, 0.05, 25.0), 0.05);
        assert_eq!(clamp(5.0, 0.05, 25.0), 5.0);
    }
}
