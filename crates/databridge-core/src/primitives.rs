//! # Pipeline Primitives
//!
//! Hardcoded constants for the databridge CORE.
//!
//! These values are compiled into the binary. The retry and breaker values are
//! defaults only; the app layer may override them from configuration.

/// Sub-path appended to the configured bulk-data base address.
pub const BULK_DATA_PUSH_PATH: &str = "/pushbigdata";

/// Prefix of every `ForwardingFailure` message.
pub const FORWARDING_FAILURE_PREFIX: &str = "Not able to send data to bulk data server: ";

/// Length of a lower-case hex MD5 digest.
pub const CHECKSUM_HEX_LENGTH: usize = 32;

// =============================================================================
// RETRY DEFAULTS
// =============================================================================

/// Maximum forwarding attempts, including the first.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Delay before the second attempt.
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 500;

/// Each subsequent delay is the previous one times this factor.
///
/// With the defaults the schedule is 500ms, 1500ms.
pub const DEFAULT_BACKOFF_MULTIPLIER: u32 = 3;

/// Upper bound for a single backoff sleep.
pub const DEFAULT_MAX_DELAY_MS: u64 = 10_000;

// =============================================================================
// CIRCUIT BREAKER DEFAULTS
// =============================================================================

/// Failure percentage (of calls in the window) at which the breaker opens.
pub const DEFAULT_FAILURE_RATE_THRESHOLD_PERCENT: u8 = 50;

/// Calls that must be observed in the window before the rate is evaluated.
pub const DEFAULT_MINIMUM_CALLS: u32 = 5;

/// Length of the rolling failure window.
pub const DEFAULT_FAILURE_WINDOW_MS: u64 = 60_000;

/// Time the breaker stays open before admitting a half-open probe.
pub const DEFAULT_RESET_TIMEOUT_MS: u64 = 20_000;

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length for block names.
///
/// Names longer than this are rejected at the API boundary.
pub const MAX_NAME_LENGTH: usize = 256;

/// Maximum length for block bodies (1 MiB).
pub const MAX_BODY_LENGTH: usize = 1024 * 1024;
