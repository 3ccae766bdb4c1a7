//! # Downstream Forwarder
//!
//! Sends a verified envelope to the bulk-data backend.
//!
//! ## Per-call state machine
//!
//! ```text
//! breaker open ──────────────────────────────────────────► Fail (CircuitOpen)
//! breaker admits ─► Attempting ─► Success
//!                       │
//!                       ├─ retryable error, attempts left ─► sleep(backoff) ─► Attempting
//!                       ├─ retryable error, none left ────► Fail (RetriesExhausted)
//!                       └─ non-retryable error ───────────► Fail
//! ```
//!
//! Every failure path goes through one recovery step that wraps the underlying
//! cause in a `ForwardingFailure`. The forwarder keeps no state across calls
//! except the shared breaker statistics.
//!
//! The transport is a trait so the CORE stays free of network dependencies;
//! the app layer provides the HTTP implementation.

mod breaker;
mod retry;

pub use breaker::{CallPermit, CircuitBreaker, CircuitBreakerConfig, CircuitSnapshot, CircuitState};
pub use retry::{RetryPolicy, Sleeper, ThreadSleeper};

use crate::DataEnvelope;
use crate::primitives::FORWARDING_FAILURE_PREFIX;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

// =============================================================================
// ERRORS
// =============================================================================

/// Failure of a single push attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The backend answered with a client or server error status.
    #[error("bulk data server responded with status {status}: {body}")]
    Status { status: u16, body: String },

    /// The backend could not be reached or did not answer in time.
    #[error("connection to bulk data server failed: {0}")]
    Connection(String),

    /// The envelope could not be encoded for the wire.
    #[error("envelope encoding failed: {0}")]
    Encode(String),
}

impl TransportError {
    /// Transient failures are HTTP-style status errors (4xx and 5xx).
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Status { status, .. } if (400..600).contains(status))
    }
}

/// Why a forward call gave up.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ForwardCause {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("circuit breaker is open")]
    CircuitOpen,
}

/// Terminal forwarding failure, after retries or a breaker short-circuit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ForwardingFailure {
    message: String,
    attempts: u32,
    #[source]
    cause: ForwardCause,
}

impl ForwardingFailure {
    #[must_use]
    pub fn new(cause: ForwardCause, attempts: u32) -> Self {
        Self {
            message: format!("{FORWARDING_FAILURE_PREFIX}{cause}"),
            attempts,
            cause,
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Transport attempts made. Zero when the breaker rejected the call.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    #[must_use]
    pub fn cause(&self) -> &ForwardCause {
        &self.cause
    }

    #[must_use]
    pub fn is_circuit_open(&self) -> bool {
        matches!(self.cause, ForwardCause::CircuitOpen)
    }
}

// =============================================================================
// TRAITS
// =============================================================================

/// One blocking push of an envelope to the bulk-data backend.
pub trait BulkDataTransport: Send + Sync {
    fn push(&self, envelope: &DataEnvelope) -> Result<(), TransportError>;
}

/// What the ingestion orchestrator needs from the forwarding step.
pub trait EnvelopeForwarder: Send + Sync {
    fn forward(&self, envelope: &DataEnvelope) -> Result<(), ForwardingFailure>;
}

// =============================================================================
// FORWARDER
// =============================================================================

/// Retry, breaker and recovery policy around a `BulkDataTransport`.
pub struct Forwarder<T> {
    transport: T,
    policy: RetryPolicy,
    breaker: Arc<CircuitBreaker>,
    sleeper: Arc<dyn Sleeper>,
}

impl<T> std::fmt::Debug for Forwarder<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Forwarder")
            .field("policy", &self.policy)
            .field("breaker", &self.breaker.snapshot())
            .finish_non_exhaustive()
    }
}

impl<T: BulkDataTransport> Forwarder<T> {
    /// Create a forwarder that sleeps on the calling thread between attempts.
    pub fn new(transport: T, policy: RetryPolicy, breaker: Arc<CircuitBreaker>) -> Self {
        Self {
            transport,
            policy,
            breaker,
            sleeper: Arc::new(ThreadSleeper),
        }
    }

    /// Replace the backoff sleeper.
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    #[must_use]
    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    /// Run the attempt loop. Returns attempts used, or the last error with them.
    fn push_with_retry(&self, envelope: &DataEnvelope) -> Result<u32, (TransportError, u32)> {
        let mut attempt: u32 = 1;
        loop {
            info!(
                name = envelope.name(),
                attempt = attempt,
                "Pushing envelope to bulk data server"
            );
            match self.transport.push(envelope) {
                Ok(()) => return Ok(attempt),
                Err(error) if error.is_retryable() && attempt < self.policy.max_attempts => {
                    let delay = self.policy.delay_after(attempt);
                    warn!(
                        name = envelope.name(),
                        attempt = attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Bulk data push failed, retrying"
                    );
                    self.sleeper.sleep(delay);
                    attempt = attempt.saturating_add(1);
                }
                Err(error) => return Err((error, attempt)),
            }
        }
    }

    /// Recovery step: convert any terminal cause into the domain failure.
    fn recover(&self, envelope: &DataEnvelope, cause: ForwardCause, attempts: u32) -> ForwardingFailure {
        let failure = ForwardingFailure::new(cause, attempts);
        warn!(
            name = envelope.name(),
            attempts = attempts,
            error = %failure,
            "Giving up on bulk data push"
        );
        failure
    }
}

impl<T: BulkDataTransport> EnvelopeForwarder for Forwarder<T> {
    fn forward(&self, envelope: &DataEnvelope) -> Result<(), ForwardingFailure> {
        let Some(permit) = self.breaker.try_acquire() else {
            return Err(self.recover(envelope, ForwardCause::CircuitOpen, 0));
        };

        match self.push_with_retry(envelope) {
            Ok(attempts) => {
                self.breaker.record_success(permit);
                info!(
                    name = envelope.name(),
                    attempts = attempts,
                    "Pushed envelope to bulk data server"
                );
                Ok(())
            }
            Err((error, attempts)) => {
                self.breaker.record_failure(permit);
                Err(self.recover(envelope, ForwardCause::Transport(error), attempts))
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
