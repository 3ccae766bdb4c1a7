//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API that are not
//! part of the core data model. Envelopes travel as `DataEnvelope` directly.

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use databridge_core::{
    BridgeError, CircuitSnapshot, DataEnvelope,
    primitives::{MAX_BODY_LENGTH, MAX_NAME_LENGTH},
};
use serde::{Deserialize, Serialize};

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub circuit_breaker: CircuitSnapshot,
}

impl HealthResponse {
    pub fn new(circuit_breaker: CircuitSnapshot) -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            circuit_breaker,
        }
    }
}

// =============================================================================
// ERROR MESSAGE
// =============================================================================

/// Error body returned for failed operations.
///
/// ```json
/// {"timestamp":"2026-01-01T12:00:00Z","status":"BAD_REQUEST","message":"Resource Not Found","errors":["..."]}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorMessage {
    /// RFC 3339, UTC.
    pub timestamp: DateTime<Utc>,
    /// Status constant name, e.g. `BAD_REQUEST`.
    pub status: String,
    pub message: String,
    pub errors: Vec<String>,
}

impl ErrorMessage {
    pub fn new(status: StatusCode, message: impl Into<String>, errors: Vec<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            status: status_name(status),
            message: message.into(),
            errors,
        }
    }
}

/// Upper-snake name of a status code: 400 -> `BAD_REQUEST`.
pub fn status_name(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => reason.to_uppercase().replace([' ', '-'], "_"),
        None => status.as_str().to_string(),
    }
}

// =============================================================================
// VALIDATION
// =============================================================================

/// Boundary checks applied before an envelope reaches the core.
///
/// - `name` is non-blank and within `MAX_NAME_LENGTH` (256 bytes)
/// - `dataBody` is within `MAX_BODY_LENGTH` (1 MiB)
pub fn validate_envelope(envelope: &DataEnvelope) -> Result<(), BridgeError> {
    let name = envelope.name();
    if name.trim().is_empty() {
        return Err(BridgeError::InvalidEnvelope(
            "name must not be blank".to_string(),
        ));
    }
    if name.len() > MAX_NAME_LENGTH {
        return Err(BridgeError::InvalidEnvelope(format!(
            "name length {} exceeds maximum {} bytes",
            name.len(),
            MAX_NAME_LENGTH
        )));
    }

    let body_len = envelope.content().len();
    if body_len > MAX_BODY_LENGTH {
        return Err(BridgeError::InvalidEnvelope(format!(
            "dataBody length {} exceeds maximum {} bytes",
            body_len, MAX_BODY_LENGTH
        )));
    }
    Ok(())
}
