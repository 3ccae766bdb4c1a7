//! # Retry Policy
//!
//! Bounded attempts with exponential backoff, integer arithmetic only.
//!
//! Delay after failed attempt `k` (1-based) is
//! `initial_delay_ms * multiplier^(k-1)`, capped at `max_delay_ms`.

use crate::BridgeError;
use crate::primitives::{
    DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_INITIAL_DELAY_MS, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_MAX_DELAY_MS,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry policy configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial attempt).
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_delay_ms: u64,
    /// Growth factor between consecutive delays.
    pub multiplier: u32,
    /// Cap for any single delay.
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay_ms: DEFAULT_INITIAL_DELAY_MS,
            multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
        }
    }
}

impl RetryPolicy {
    /// Reject policies that cannot make progress.
    pub fn validate(&self) -> Result<(), BridgeError> {
        if self.max_attempts == 0 {
            return Err(BridgeError::Configuration(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.multiplier == 0 {
            return Err(BridgeError::Configuration(
                "retry.multiplier must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Backoff to sleep after the failed attempt number `attempt` (1-based).
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = u64::from(self.multiplier).saturating_pow(attempt.saturating_sub(1));
        let millis = self
            .initial_delay_ms
            .saturating_mul(factor)
            .min(self.max_delay_ms);
        Duration::from_millis(millis)
    }

    /// Every delay the policy can produce, in order. Length is `max_attempts - 1`.
    #[must_use]
    pub fn schedule(&self) -> Vec<Duration> {
        (1..self.max_attempts).map(|a| self.delay_after(a)).collect()
    }
}

// =============================================================================
// SLEEPER
// =============================================================================

/// Blocks the calling thread between attempts.
///
/// Production code uses [`ThreadSleeper`]; tests substitute a recorder.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// Sleeps with `std::thread::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
