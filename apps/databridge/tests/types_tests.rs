//! Unit tests for wire types serialization/deserialization.

#![allow(clippy::unwrap_used, clippy::panic)]

use axum::http::StatusCode;
use databridge::api::{ErrorMessage, HealthResponse, status_name, validate_envelope};
use databridge_core::{
    BlockType, BridgeError, CircuitBreaker, DataBody, DataEnvelope, DataHeader, StoredBlock,
};

// =============================================================================
// ENVELOPE WIRE SHAPE
// =============================================================================

#[test]
fn test_envelope_serializes_camel_case() {
    let envelope = DataEnvelope::new(
        DataHeader::new("A", BlockType::BlockTypeB),
        DataBody::new("hello"),
        "5d41402abc4b2a76b9719d911017c592",
    );

    let json = serde_json::to_string(&envelope).unwrap();
    assert_eq!(
        json,
        r#"{"dataHeader":{"name":"A","blockType":"BLOCKTYPEB"},"dataBody":{"dataBody":"hello"},"checksum":"5d41402abc4b2a76b9719d911017c592"}"#
    );
}

#[test]
fn test_envelope_from_storage_has_null_checksum() {
    let envelope = StoredBlock::new("A", BlockType::BlockTypeA, "hello").into_envelope();
    let value = serde_json::to_value(&envelope).unwrap();
    assert!(value["checksum"].is_null());
}

#[test]
fn test_envelope_without_checksum_deserializes() {
    let json = r#"{"dataHeader":{"name":"A","blockType":"BLOCKTYPEA"},"dataBody":{"dataBody":"x"}}"#;
    let envelope: DataEnvelope = serde_json::from_str(json).unwrap();
    assert_eq!(envelope.checksum, None);
    assert_eq!(envelope.data_header.block_type, BlockType::BlockTypeA);
}

#[test]
fn test_unknown_block_type_fails_to_deserialize() {
    let json = r#"{"dataHeader":{"name":"A","blockType":"blocktypea"},"dataBody":{"dataBody":"x"}}"#;
    assert!(serde_json::from_str::<DataEnvelope>(json).is_err());
}

// =============================================================================
// VALIDATION
// =============================================================================

#[test]
fn test_validate_envelope_limits() {
    let ok = DataEnvelope::new(
        DataHeader::new("n".repeat(256), BlockType::BlockTypeA),
        DataBody::new(""),
        "",
    );
    assert!(validate_envelope(&ok).is_ok());

    let too_long = DataEnvelope::new(
        DataHeader::new("n".repeat(257), BlockType::BlockTypeA),
        DataBody::new(""),
        "",
    );
    assert!(matches!(
        validate_envelope(&too_long),
        Err(BridgeError::InvalidEnvelope(_))
    ));

    let big_body = DataEnvelope::new(
        DataHeader::new("A", BlockType::BlockTypeA),
        DataBody::new("x".repeat(1024 * 1024 + 1)),
        "",
    );
    assert!(validate_envelope(&big_body).is_err());
}

// =============================================================================
// RESPONSES
// =============================================================================

#[test]
fn test_error_message_fields() {
    let error = ErrorMessage::new(
        StatusCode::BAD_REQUEST,
        "Resource Not Found",
        vec!["Block not found: Z".into()],
    );
    let value = serde_json::to_value(&error).unwrap();

    assert_eq!(value["status"], "BAD_REQUEST");
    assert_eq!(value["message"], "Resource Not Found");
    assert_eq!(value["errors"][0], "Block not found: Z");

    let timestamp = value["timestamp"].as_str().unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());
}

#[test]
fn test_status_names_are_upper_snake_case() {
    assert_eq!(status_name(StatusCode::INTERNAL_SERVER_ERROR), "INTERNAL_SERVER_ERROR");
    assert_eq!(status_name(StatusCode::CONFLICT), "CONFLICT");
    assert_eq!(status_name(StatusCode::PAYLOAD_TOO_LARGE), "PAYLOAD_TOO_LARGE");
}

#[test]
fn test_health_response_reports_breaker_state() {
    let health = HealthResponse::new(CircuitBreaker::default().snapshot());
    let value = serde_json::to_value(&health).unwrap();

    assert_eq!(value["status"], "ok");
    assert_eq!(value["circuit_breaker"]["state"], "closed");
}
