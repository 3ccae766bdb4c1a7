//! Integration tests for the databridge HTTP API.
//!
//! Uses axum-test to exercise the handlers without a real socket, over an
//! in-memory store and a scripted bulk-data transport.

// Allow holding MutexGuard across await in auth tests - tests are serialized
// intentionally to avoid env var conflicts
#![allow(clippy::unwrap_used, clippy::panic, clippy::await_holding_lock)]

use axum::http::{HeaderValue, StatusCode, header::AUTHORIZATION};
use axum_test::TestServer;
use databridge::api::{API_KEY_ENV, AppState, ErrorMessage, HealthResponse, create_router};
use databridge_core::{
    BulkDataTransport, CircuitBreaker, CircuitBreakerConfig, CircuitState, DataEnvelope,
    DataServer, Forwarder, MemoryBlockStore, RetryPolicy, Sleeper, TransportError, checksum,
};
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Mutex to serialize tests since auth tests modify env vars.
static ENV_TEST_MUTEX: Mutex<()> = Mutex::new(());

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Transport that replays scripted results, then succeeds.
#[derive(Default)]
struct ScriptedTransport {
    script: Mutex<VecDeque<Result<(), TransportError>>>,
}

impl BulkDataTransport for ScriptedTransport {
    fn push(&self, _envelope: &DataEnvelope) -> Result<(), TransportError> {
        self.script.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }
}

struct NoSleep;

impl Sleeper for NoSleep {
    fn sleep(&self, _duration: Duration) {}
}

/// Guard that holds the mutex and clears the API key on drop.
struct TestGuard {
    _guard: std::sync::MutexGuard<'static, ()>,
}

impl Drop for TestGuard {
    fn drop(&mut self) {
        // SAFETY: Tests run sequentially under ENV_TEST_MUTEX, so no concurrent env access.
        unsafe { std::env::remove_var(API_KEY_ENV) };
    }
}

fn build_server(
    script: Vec<Result<(), TransportError>>,
    api_key: Option<&str>,
) -> (TestServer, TestGuard) {
    let guard = ENV_TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    // SAFETY: Tests run sequentially under ENV_TEST_MUTEX, so no concurrent env access.
    unsafe {
        match api_key {
            Some(key) => std::env::set_var(API_KEY_ENV, key),
            None => std::env::remove_var(API_KEY_ENV),
        }
    }

    let breaker = Arc::new(CircuitBreaker::new(CircuitBreakerConfig::default()));
    let transport = ScriptedTransport {
        script: Mutex::new(script.into()),
    };
    let forwarder = Forwarder::new(transport, RetryPolicy::default(), Arc::clone(&breaker))
        .with_sleeper(Arc::new(NoSleep));
    let server = DataServer::new(Arc::new(MemoryBlockStore::new()), Arc::new(forwarder));

    let router = create_router(AppState::new(server, breaker));
    (
        TestServer::new(router).unwrap(),
        TestGuard { _guard: guard },
    )
}

fn create_test_server() -> (TestServer, TestGuard) {
    build_server(vec![], None)
}

fn envelope_json(name: &str, block_type: &str, body: &str) -> Value {
    json!({
        "dataHeader": { "name": name, "blockType": block_type },
        "dataBody": { "dataBody": body },
        "checksum": checksum::digest(body.as_bytes()),
    })
}

fn server_error() -> Result<(), TransportError> {
    Err(TransportError::Status {
        status: 503,
        body: "Service Unavailable".to_string(),
    })
}

// =============================================================================
// HEALTH ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let (server, _guard) = create_test_server();

    let response = server.get("/health").await;

    response.assert_status_ok();
    let health: HealthResponse = response.json();
    assert_eq!(health.status, "ok");
    assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
    assert_eq!(health.circuit_breaker.state, CircuitState::Closed);
}

// =============================================================================
// PUSH ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_push_valid_envelope_returns_created() {
    let (server, _guard) = create_test_server();

    let response = server
        .post("/dataserver/pushdata")
        .json(&envelope_json("A", "BLOCKTYPEA", "hello"))
        .await;

    response.assert_status(StatusCode::CREATED);
    assert!(response.json::<bool>());
}

#[tokio::test]
async fn test_push_checksum_mismatch_returns_false() {
    let (server, _guard) = create_test_server();

    let mut body = envelope_json("B", "BLOCKTYPEA", "hello");
    body["checksum"] = json!("00000000000000000000000000000000");
    let response = server.post("/dataserver/pushdata").json(&body).await;

    response.assert_status_ok();
    assert!(!response.json::<bool>());

    let listed = server.get("/dataserver/data/BLOCKTYPEA").await;
    assert!(listed.json::<Vec<Value>>().is_empty());
}

#[tokio::test]
async fn test_push_missing_checksum_returns_false() {
    let (server, _guard) = create_test_server();

    let body = json!({
        "dataHeader": { "name": "A", "blockType": "BLOCKTYPEA" },
        "dataBody": { "dataBody": "hello" }
    });
    let response = server.post("/dataserver/pushdata").json(&body).await;

    response.assert_status_ok();
    assert!(!response.json::<bool>());
}

#[tokio::test]
async fn test_push_invalid_json_is_bad_request() {
    let (server, _guard) = create_test_server();

    let response = server
        .post("/dataserver/pushdata")
        .bytes(bytes::Bytes::from("not valid json"))
        .content_type("application/json")
        .await;

    response.assert_status_bad_request();
    let error: ErrorMessage = response.json();
    assert_eq!(error.status, "BAD_REQUEST");
    assert_eq!(error.message, "Invalid envelope");
}

#[tokio::test]
async fn test_push_unknown_block_type_is_bad_request() {
    let (server, _guard) = create_test_server();

    let response = server
        .post("/dataserver/pushdata")
        .json(&envelope_json("A", "BLOCKTYPEC", "hello"))
        .await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn test_push_blank_name_is_bad_request() {
    let (server, _guard) = create_test_server();

    let response = server
        .post("/dataserver/pushdata")
        .json(&envelope_json("   ", "BLOCKTYPEA", "hello"))
        .await;

    response.assert_status_bad_request();
    let error: ErrorMessage = response.json();
    assert!(error.errors[0].contains("blank"));
}

#[tokio::test]
async fn test_push_oversized_name_is_bad_request() {
    let (server, _guard) = create_test_server();

    let name = "n".repeat(257);
    let response = server
        .post("/dataserver/pushdata")
        .json(&envelope_json(&name, "BLOCKTYPEA", "hello"))
        .await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn test_push_body_over_limit_is_payload_too_large() {
    let (server, _guard) = create_test_server();

    let body = "x".repeat(3 * 1024 * 1024);
    let response = server
        .post("/dataserver/pushdata")
        .bytes(bytes::Bytes::from(body))
        .content_type("application/json")
        .await;

    response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
    let error: ErrorMessage = response.json();
    assert_eq!(error.status, "PAYLOAD_TOO_LARGE");
}

#[tokio::test]
async fn test_push_without_json_content_type_is_unsupported_media_type() {
    let (server, _guard) = create_test_server();

    let response = server.post("/dataserver/pushdata").text("hello").await;

    response.assert_status(StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let error: ErrorMessage = response.json();
    assert_eq!(error.status, "UNSUPPORTED_MEDIA_TYPE");
}

#[tokio::test]
async fn test_push_duplicate_name_is_conflict() {
    let (server, _guard) = create_test_server();
    let body = envelope_json("A", "BLOCKTYPEA", "hello");

    server
        .post("/dataserver/pushdata")
        .json(&body)
        .await
        .assert_status(StatusCode::CREATED);
    let response = server.post("/dataserver/pushdata").json(&body).await;

    response.assert_status(StatusCode::CONFLICT);
    let error: ErrorMessage = response.json();
    assert_eq!(error.status, "CONFLICT");
}

#[tokio::test]
async fn test_push_forwarding_failure_is_server_error_and_keeps_record() {
    let (server, _guard) = build_server(vec![server_error(), server_error(), server_error()], None);

    let response = server
        .post("/dataserver/pushdata")
        .json(&envelope_json("A", "BLOCKTYPEA", "hello"))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let error: ErrorMessage = response.json();
    assert_eq!(error.status, "INTERNAL_SERVER_ERROR");
    assert_eq!(error.message, "Timeout when pushing data");
    assert!(error.errors[0].starts_with("Not able to send data to bulk data server: "));
    assert!(error.timestamp <= chrono::Utc::now());

    let listed: Vec<Value> = server.get("/dataserver/data/BLOCKTYPEA").await.json();
    assert_eq!(listed.len(), 1);

    let health: HealthResponse = server.get("/health").await.json();
    assert_eq!(health.circuit_breaker.total_failures, 1);
}

#[tokio::test]
async fn test_push_recovers_after_transient_failures() {
    let (server, _guard) = build_server(vec![server_error(), server_error()], None);

    let response = server
        .post("/dataserver/pushdata")
        .json(&envelope_json("A", "BLOCKTYPEA", "hello"))
        .await;

    response.assert_status(StatusCode::CREATED);
}

// =============================================================================
// QUERY ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_get_data_returns_envelopes_without_checksum() {
    let (server, _guard) = create_test_server();

    for (name, block_type) in [("A", "BLOCKTYPEA"), ("B", "BLOCKTYPEB"), ("C", "BLOCKTYPEA")] {
        server
            .post("/dataserver/pushdata")
            .json(&envelope_json(name, block_type, "hello"))
            .await
            .assert_status(StatusCode::CREATED);
    }

    let response = server.get("/dataserver/data/BLOCKTYPEA").await;
    response.assert_status_ok();

    let listed: Vec<Value> = response.json();
    assert_eq!(listed.len(), 2);
    for envelope in &listed {
        assert_eq!(envelope["dataHeader"]["blockType"], "BLOCKTYPEA");
        assert_eq!(envelope["dataBody"]["dataBody"], "hello");
        assert!(envelope["checksum"].is_null());
    }
}

#[tokio::test]
async fn test_get_data_empty_type_returns_empty_list() {
    let (server, _guard) = create_test_server();

    let response = server.get("/dataserver/data/BLOCKTYPEB").await;

    response.assert_status_ok();
    assert!(response.json::<Vec<Value>>().is_empty());
}

#[tokio::test]
async fn test_get_data_unknown_type_is_bad_request() {
    let (server, _guard) = create_test_server();

    let response = server.get("/dataserver/data/blocktypea").await;

    response.assert_status_bad_request();
    let error: ErrorMessage = response.json();
    assert_eq!(error.message, "Invalid block type");
}

// =============================================================================
// UPDATE ENDPOINT TESTS
// =============================================================================

#[tokio::test]
async fn test_update_moves_block_to_new_type() {
    let (server, _guard) = create_test_server();
    server
        .post("/dataserver/pushdata")
        .json(&envelope_json("A", "BLOCKTYPEA", "hello"))
        .await
        .assert_status(StatusCode::CREATED);

    let response = server.patch("/dataserver/update/A/BLOCKTYPEB").await;

    response.assert_status_ok();
    assert!(response.json::<bool>());

    let a: Vec<Value> = server.get("/dataserver/data/BLOCKTYPEA").await.json();
    let b: Vec<Value> = server.get("/dataserver/data/BLOCKTYPEB").await.json();
    assert!(a.is_empty());
    assert_eq!(b.len(), 1);
    assert_eq!(b[0]["dataHeader"]["name"], "A");
}

#[tokio::test]
async fn test_update_missing_name_is_resource_not_found() {
    let (server, _guard) = create_test_server();

    let response = server.patch("/dataserver/update/ZZZ/BLOCKTYPEB").await;

    response.assert_status_bad_request();
    let error: ErrorMessage = response.json();
    assert_eq!(error.message, "Resource Not Found");
    assert_eq!(error.status, "BAD_REQUEST");
}

#[tokio::test]
async fn test_update_unknown_type_is_bad_request() {
    let (server, _guard) = create_test_server();

    let response = server.patch("/dataserver/update/A/NOPE").await;

    response.assert_status_bad_request();
}

// =============================================================================
// AUTHENTICATION MIDDLEWARE TESTS
// =============================================================================

#[tokio::test]
async fn test_auth_missing_header_is_unauthorized() {
    let (server, _guard) = build_server(vec![], Some("test-secret-key-12345"));

    let response = server.get("/dataserver/data/BLOCKTYPEA").await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_valid_bearer_token() {
    let api_key = "test-secret-key-12345";
    let (server, _guard) = build_server(vec![], Some(api_key));

    let response = server
        .get("/dataserver/data/BLOCKTYPEA")
        .add_header(
            AUTHORIZATION,
            format!("Bearer {}", api_key).parse::<HeaderValue>().unwrap(),
        )
        .await;

    response.assert_status_ok();
}

#[tokio::test]
async fn test_auth_wrong_key_is_unauthorized() {
    let (server, _guard) = build_server(vec![], Some("test-secret-key-12345"));

    let response = server
        .patch("/dataserver/update/A/BLOCKTYPEB")
        .add_header(AUTHORIZATION, HeaderValue::from_static("Bearer wrong"))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_health_is_exempt() {
    let (server, _guard) = build_server(vec![], Some("test-secret-key-12345"));

    let response = server.get("/health").await;

    response.assert_status_ok();
}
