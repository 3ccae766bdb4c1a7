//! # API Endpoint Handlers
//!
//! This module implements the actual HTTP endpoint handlers.
//!
//! The core pipeline blocks (store I/O, backoff sleeps, the transport), so
//! every core call is moved onto tokio's blocking pool.

use super::{
    AppState,
    types::{ErrorMessage, HealthResponse, validate_envelope},
};
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use databridge_core::{BlockType, BridgeError, DataEnvelope};

// =============================================================================
// ERROR MAPPING
// =============================================================================

/// Map a core error to its HTTP status and `ErrorMessage` body.
pub fn bridge_error_response(err: &BridgeError) -> Response {
    let (status, message) = match err {
        BridgeError::InvalidEnvelope(_) => (StatusCode::BAD_REQUEST, "Invalid envelope"),
        BridgeError::UnknownBlockType(_) => (StatusCode::BAD_REQUEST, "Invalid block type"),
        BridgeError::Conflict(_) => (StatusCode::CONFLICT, "Resource Already Exists"),
        BridgeError::NotFound(_) => (StatusCode::BAD_REQUEST, "Resource Not Found"),
        BridgeError::Forwarding(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "Timeout when pushing data")
        }
        BridgeError::Configuration(_)
        | BridgeError::IoError(_)
        | BridgeError::SerializationError(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
        }
    };

    if status.is_server_error() {
        tracing::error!(error = %err, "Request failed");
    } else {
        tracing::info!(error = %err, "Request rejected");
    }

    (
        status,
        Json(ErrorMessage::new(status, message, vec![err.to_string()])),
    )
        .into_response()
}

/// Map a body that failed to extract as JSON.
///
/// Malformed or mistyped envelopes are `InvalidEnvelope`. Other rejections
/// (oversized body, wrong content type) keep the status axum assigned.
fn json_rejection_response(rejection: &JsonRejection) -> Response {
    let status = rejection.status();
    if matches!(status, StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY) {
        return bridge_error_response(&BridgeError::InvalidEnvelope(rejection.body_text()));
    }

    tracing::info!(status = %status, error = %rejection.body_text(), "Request body rejected");
    let message = status.canonical_reason().unwrap_or("Request rejected");
    (
        status,
        Json(ErrorMessage::new(status, message, vec![rejection.body_text()])),
    )
        .into_response()
}

/// Run a blocking core call on the blocking pool.
async fn run_blocking<T, F>(f: F) -> Result<T, BridgeError>
where
    F: FnOnce() -> Result<T, BridgeError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| BridgeError::IoError(format!("Worker task failed: {}", e)))?
}

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse::new(state.breaker.snapshot()))
}

// =============================================================================
// PUSH HANDLER
// =============================================================================

/// Verify, persist and forward an envelope.
///
/// 201 + `true` when accepted, 200 + `false` on checksum mismatch.
pub async fn push_handler(
    State(state): State<AppState>,
    payload: Result<Json<DataEnvelope>, JsonRejection>,
) -> Response {
    let envelope = match payload {
        Ok(Json(envelope)) => envelope,
        Err(rejection) => return json_rejection_response(&rejection),
    };

    if let Err(e) = validate_envelope(&envelope) {
        return bridge_error_response(&e);
    }

    let server = state.server.clone();
    match run_blocking(move || server.save_envelope(&envelope)).await {
        Ok(true) => (StatusCode::CREATED, Json(true)).into_response(),
        Ok(false) => (StatusCode::OK, Json(false)).into_response(),
        Err(e) => bridge_error_response(&e),
    }
}

// =============================================================================
// QUERY HANDLER
// =============================================================================

/// List every stored envelope of a block type.
pub async fn data_by_type_handler(
    State(state): State<AppState>,
    Path(block_type): Path<String>,
) -> Response {
    let block_type = match block_type.parse::<BlockType>() {
        Ok(t) => t,
        Err(e) => return bridge_error_response(&e),
    };

    let server = state.server.clone();
    match run_blocking(move || server.query_by_type(block_type)).await {
        Ok(envelopes) => (StatusCode::OK, Json(envelopes)).into_response(),
        Err(e) => bridge_error_response(&e),
    }
}

// =============================================================================
// UPDATE HANDLER
// =============================================================================

/// Reclassify a stored block by name.
pub async fn update_handler(
    State(state): State<AppState>,
    Path((name, new_block_type)): Path<(String, String)>,
) -> Response {
    let block_type = match new_block_type.parse::<BlockType>() {
        Ok(t) => t,
        Err(e) => return bridge_error_response(&e),
    };

    let server = state.server.clone();
    match run_blocking(move || server.update_by_name(&name, block_type)).await {
        Ok(updated) => (StatusCode::OK, Json(updated)).into_response(),
        Err(e) => bridge_error_response(&e),
    }
}
