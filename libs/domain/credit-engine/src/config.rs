use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {name} has an invalid value {value:?}: {source}")]
    InvalidFloat { name: &'static str, value: String, source: std::num::ParseFloatError },
    #[error("environment variable {name} has an invalid value {value:?}: {source}")]
    InvalidInt { name: &'static str, value: String, source: std::num::ParseIntError },
    #[error("GRIDX_REWARD_RATIO must be within [0, 1], got {0}")]
    RewardRatioOutOfRange(f64),
}

/// Time-based billing rates (§4.3). Loaded once at startup; a malformed
/// value fails startup rather than silently falling back to a default.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CreditEngineConfig {
    pub cost_per_second: f64,
    pub min_cost: f64,
    pub max_cost: f64,
    pub reward_ratio: f64,
    pub default_job_timeout_seconds: i64,
    pub initial_balance: f64,
}

impl Default for CreditEngineConfig {
    fn default() -> Self {
        Self {
            cost_per_second: 0.1,
            min_cost: 0.05,
            max_cost: 25.0,
            reward_ratio: 0.85,
            default_job_timeout_seconds: 60,
            initial_balance: 100.0,
        }
    }
}

impl CreditEngineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let config = Self {
            cost_per_second: parse_float_env("GRIDX_COST_PER_SECOND", defaults.cost_per_second)?,
            min_cost: parse_float_env("GRIDX_MIN_COST", defaults.min_cost)?,
            max_cost: parse_float_env("GRIDX_MAX_COST", defaults.max_cost)?,
            reward_ratio: parse_float_env("GRIDX_REWARD_RATIO", defaults.reward_ratio)?,
            default_job_timeout_seconds: parse_int_env(
                "GRIDX_DEFAULT_JOB_TIMEOUT",
                defaults.default_job_timeout_seconds,
            )?,
            initial_balance: parse_float_env("GRIDX_INITIAL_CREDITS", defaults.initial_balance)?,
        };

        if !(0.0..=1.0).contains(&config.reward_ratio) {
            return Err(ConfigError::RewardRatioOutOfRange(config.reward_ratio));
        }

        Ok(config)
    }
}

fn parse_float_env(name: &'static str, default: f64) -> Result<f64, ConfigError> {
    match std::env::var(name) {
        Ok(value) => value
            .parse()
            .map_err(|source| ConfigError::InvalidFloat { name, value, source }),
        Err(_) => Ok(default),
    }
}

fn parse_int_env(name: &'static str, default: i64) -> Result<i64, ConfigError> {
    match std::env::var(name) {
        Ok(value) => value
            .parse()
            .map_err(|source| ConfigError::InvalidInt { name, value, source }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let config = CreditEngineConfig::default();
        assert_eq!(config.cost_per_second, 0.1);
        assert_eq!(config.min_cost, 0.05);
        assert_eq!(config.max_cost, 25.0);
        assert_eq!(config.reward_ratio, 0.85);
        assert_eq!(config.default_job_timeout_seconds, 60);
        assert_eq!(config.initial_balance, 100.0);
    }
}
