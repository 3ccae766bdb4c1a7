//! # Circuit Breaker
//!
//! Failure isolation for the bulk-data backend.
//!
//! ```text
//!                  failure rate >= threshold
//!      ┌──────────┐ ─────────────────────────► ┌──────────┐
//!      │  CLOSED  │                            │   OPEN   │ ◄─────┐
//!      │ (normal) │                            │ (reject) │       │
//!      └──────────┘                            └──────────┘       │
//!            ▲                                       │            │
//!            │ probe succeeds                        │ reset      │ probe
//!            │                                       ▼ timeout    │ fails
//!            │                                 ┌──────────┐       │
//!            └──────────────────────────────── │HALF-OPEN │ ──────┘
//!                                              │ (1 probe)│
//!                                              └──────────┘
//! ```
//!
//! One outcome is recorded per forward call, i.e. per whole retry sequence.
//! The rate is evaluated over a rolling time window once `minimum_calls`
//! outcomes are in it. All arithmetic is integer: the breaker opens when
//! `failures * 100 >= threshold_percent * calls`.
//!
//! The state is process-wide for one downstream target; share it with `Arc`.
//!
//! Admission hands out a `CallPermit` stamped with the current state
//! generation. Every transition starts a new generation, and an outcome whose
//! permit belongs to an older one only updates the totals. A call admitted
//! while closed can therefore never settle the half-open probe.

use crate::BridgeError;
use crate::primitives::{
    DEFAULT_FAILURE_RATE_THRESHOLD_PERCENT, DEFAULT_FAILURE_WINDOW_MS, DEFAULT_MINIMUM_CALLS,
    DEFAULT_RESET_TIMEOUT_MS,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CircuitState {
    /// Normal operation - calls pass through
    Closed,
    /// Calls are rejected immediately
    Open,
    /// Reset timeout elapsed - a single probe call is admitted
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::HalfOpen => write!(f, "half-open"),
        }
    }
}

/// Circuit breaker configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Disable to let every call through
    pub enabled: bool,
    /// Failure percentage that opens the circuit (1..=100)
    pub failure_rate_threshold_percent: u8,
    /// Outcomes required in the window before the rate counts
    pub minimum_calls: u32,
    /// Rolling window length
    pub window_ms: u64,
    /// Time spent open before a half-open probe
    pub reset_timeout_ms: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            failure_rate_threshold_percent: DEFAULT_FAILURE_RATE_THRESHOLD_PERCENT,
            minimum_calls: DEFAULT_MINIMUM_CALLS,
            window_ms: DEFAULT_FAILURE_WINDOW_MS,
            reset_timeout_ms: DEFAULT_RESET_TIMEOUT_MS,
        }
    }
}

impl CircuitBreakerConfig {
    pub fn validate(&self) -> Result<(), BridgeError> {
        if !(1..=100).contains(&self.failure_rate_threshold_percent) {
            return Err(BridgeError::Configuration(format!(
                "circuit_breaker.failure_rate_threshold_percent must be in 1..=100, got {}",
                self.failure_rate_threshold_percent
            )));
        }
        if self.minimum_calls == 0 {
            return Err(BridgeError::Configuration(
                "circuit_breaker.minimum_calls must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    fn reset_timeout(&self) -> Duration {
        Duration::from_millis(self.reset_timeout_ms)
    }
}

/// Admission ticket for one call, returned with its outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct CallPermit {
    generation: u64,
    probe: bool,
}

impl CallPermit {
    /// `true` for the single call admitted in the half-open state.
    #[must_use]
    pub fn is_probe(&self) -> bool {
        self.probe
    }
}

/// Point-in-time view of the breaker, for health reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitSnapshot {
    pub state: CircuitState,
    pub window_calls: usize,
    pub window_failures: usize,
    pub total_calls: u64,
    pub total_failures: u64,
    pub rejected_calls: u64,
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    /// (recorded_at, failed) for calls inside the window
    outcomes: VecDeque<(Instant, bool)>,
    opened_at: Option<Instant>,
    probe_in_flight: bool,
    generation: u64,
    total_calls: u64,
    total_failures: u64,
    rejected_calls: u64,
}

impl BreakerInner {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            outcomes: VecDeque::new(),
            opened_at: None,
            probe_in_flight: false,
            generation: 0,
            total_calls: 0,
            total_failures: 0,
            rejected_calls: 0,
        }
    }

    fn prune(&mut self, now: Instant, window: Duration) {
        while let Some(&(at, _)) = self.outcomes.front() {
            if now.saturating_duration_since(at) > window {
                self.outcomes.pop_front();
            } else {
                break;
            }
        }
    }

    fn window_failures(&self) -> usize {
        self.outcomes.iter().filter(|(_, failed)| *failed).count()
    }

    fn transition(&mut self, state: CircuitState) {
        self.state = state;
        self.generation = self.generation.wrapping_add(1);
    }

    fn permit(&self, probe: bool) -> CallPermit {
        CallPermit {
            generation: self.generation,
            probe,
        }
    }

    fn open(&mut self, now: Instant) {
        self.transition(CircuitState::Open);
        self.opened_at = Some(now);
        self.probe_in_flight = false;
    }

    fn close(&mut self) {
        self.transition(CircuitState::Closed);
        self.opened_at = None;
        self.probe_in_flight = false;
        self.outcomes.clear();
    }
}

/// Rolling failure-rate circuit breaker.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

impl CircuitBreaker {
    #[must_use]
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(BreakerInner::new()),
        }
    }

    #[must_use]
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Current state, after applying a pending open -> half-open transition.
    #[must_use]
    pub fn state(&self) -> CircuitState {
        let inner = self.inner.lock();
        match (inner.state, inner.opened_at) {
            (CircuitState::Open, Some(opened_at))
                if opened_at.elapsed() >= self.config.reset_timeout() =>
            {
                CircuitState::HalfOpen
            }
            (state, _) => state,
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> CircuitSnapshot {
        let state = self.state();
        let inner = self.inner.lock();
        CircuitSnapshot {
            state,
            window_calls: inner.outcomes.len(),
            window_failures: inner.window_failures(),
            total_calls: inner.total_calls,
            total_failures: inner.total_failures,
            rejected_calls: inner.rejected_calls,
        }
    }

    /// Ask to run a call. `None` means fail fast without touching the backend.
    pub fn try_acquire(&self) -> Option<CallPermit> {
        self.try_acquire_at(Instant::now())
    }

    /// Record that an admitted call succeeded.
    pub fn record_success(&self, permit: CallPermit) {
        self.record_at(Instant::now(), permit, false);
    }

    /// Record that an admitted call failed.
    pub fn record_failure(&self, permit: CallPermit) {
        self.record_at(Instant::now(), permit, true);
    }

    fn try_acquire_at(&self, now: Instant) -> Option<CallPermit> {
        let mut inner = self.inner.lock();
        if !self.config.enabled {
            return Some(inner.permit(false));
        }

        match inner.state {
            CircuitState::Closed => Some(inner.permit(false)),
            CircuitState::Open => {
                let elapsed = inner
                    .opened_at
                    .map(|at| now.saturating_duration_since(at))
                    .unwrap_or_default();
                if elapsed >= self.config.reset_timeout() {
                    info!("Circuit breaker transitioning to half-open");
                    inner.transition(CircuitState::HalfOpen);
                    inner.probe_in_flight = true;
                    Some(inner.permit(true))
                } else {
                    inner.rejected_calls = inner.rejected_calls.saturating_add(1);
                    debug!(
                        remaining_ms = (self.config.reset_timeout() - elapsed).as_millis() as u64,
                        "Circuit breaker is open, rejecting call"
                    );
                    None
                }
            }
            CircuitState::HalfOpen => {
                if inner.probe_in_flight {
                    inner.rejected_calls = inner.rejected_calls.saturating_add(1);
                    None
                } else {
                    inner.probe_in_flight = true;
                    Some(inner.permit(true))
                }
            }
        }
    }

    fn record_at(&self, now: Instant, permit: CallPermit, failed: bool) {
        let mut inner = self.inner.lock();
        inner.total_calls = inner.total_calls.saturating_add(1);
        if failed {
            inner.total_failures = inner.total_failures.saturating_add(1);
        }
        if !self.config.enabled {
            return;
        }
        if permit.generation != inner.generation {
            debug!(
                state = %inner.state,
                failed = failed,
                "Ignoring outcome of a call admitted before the last transition"
            );
            return;
        }

        match inner.state {
            CircuitState::HalfOpen if permit.probe => {
                if failed {
                    warn!("Circuit breaker probe failed, reopening");
                    inner.open(now);
                } else {
                    info!("Circuit breaker probe succeeded, closing");
                    inner.close();
                }
            }
            CircuitState::Closed => {
                inner.outcomes.push_back((now, failed));
                inner.prune(now, self.config.window());

                let calls = inner.outcomes.len();
                let failures = inner.window_failures();
                let threshold = usize::from(self.config.failure_rate_threshold_percent);
                if calls >= self.config.minimum_calls as usize
                    && failures.saturating_mul(100) >= threshold.saturating_mul(calls)
                {
                    warn!(
                        calls = calls,
                        failures = failures,
                        threshold_percent = threshold,
                        "Circuit breaker opening due to failure rate"
                    );
                    inner.open(now);
                }
            }
            CircuitState::HalfOpen | CircuitState::Open => {}
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
