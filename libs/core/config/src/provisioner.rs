use crate::{parse_var_or, ConfigError, FromEnv};
use std::time::Duration;

/// Knobs for the long-running-operation poller.
#[derive(Clone, Debug)]
pub struct PollerConfig {
    /// Interval between status GETs once polling has started
    pub poll_interval: Duration,
    /// First backoff delay after a transient failure
    pub initial_retry_delay: Duration,
    /// Backoff ceiling
    pub max_retry_delay: Duration,
    /// Transient failures tolerated before giving up
    pub max_retries: u32,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            initial_retry_delay: Duration::from_secs(1),
            max_retry_delay: Duration::from_secs(30),
            max_retries: 10,
        }
    }
}

impl FromEnv for PollerConfig {
    /// Reads from environment variables with sensible defaults:
    /// - LRO_POLL_INTERVAL_SECS: defaults to 5
    /// - LRO_INITIAL_RETRY_DELAY_SECS: defaults to 1
    /// - LRO_MAX_RETRY_DELAY_SECS: defaults to 30
    /// - LRO_MAX_RETRIES: defaults to 10
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            poll_interval: Duration::from_secs(parse_var_or(
                "LRO_POLL_INTERVAL_SECS",
                defaults.poll_interval.as_secs(),
            )?),
            initial_retry_delay: Duration::from_secs(parse_var_or(
                "LRO_INITIAL_RETRY_DELAY_SECS",
                defaults.initial_retry_delay.as_secs(),
            )?),
            max_retry_delay: Duration::from_secs(parse_var_or(
                "LRO_MAX_RETRY_DELAY_SECS",
                defaults.max_retry_delay.as_secs(),
            )?),
            max_retries: parse_var_or("LRO_MAX_RETRIES", defaults.max_retries)?,
        })
    }
}

/// Knobs for the per-claim reconcile pass.
#[derive(Clone, Debug)]
pub struct ReconcilerConfig {
    /// Hard deadline for a single provisioning attempt
    pub claim_timeout: Duration,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            claim_timeout: Duration::from_secs(15 * 60),
        }
    }
}

impl FromEnv for ReconcilerConfig {
    /// Reads CLAIM_TIMEOUT_SECS, defaulting to 900 (15 minutes)
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            claim_timeout: Duration::from_secs(parse_var_or(
                "CLAIM_TIMEOUT_SECS",
                Self::default().claim_timeout.as_secs(),
            )?),
        })
    }
}
