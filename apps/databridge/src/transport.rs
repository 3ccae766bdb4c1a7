//! # HTTP Bulk-Data Transport
//!
//! reqwest implementation of the core `BulkDataTransport` trait.
//!
//! The core pipeline is synchronous. Handlers run it on tokio's blocking pool,
//! and this transport drives the async client from there with
//! `Handle::block_on`. It must not be called from an async task directly.

use databridge_core::primitives::BULK_DATA_PUSH_PATH;
use databridge_core::{BridgeError, BulkDataTransport, DataEnvelope, TransportError};
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tokio::runtime::Handle;

/// Posts envelopes as JSON to `{base_url}/pushbigdata`.
#[derive(Debug, Clone)]
pub struct HttpBulkDataTransport {
    client: reqwest::Client,
    push_url: String,
    handle: Handle,
}

impl HttpBulkDataTransport {
    /// Build a transport bound to the given runtime.
    pub fn new(base_url: &str, timeout: Duration, handle: Handle) -> Result<Self, BridgeError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BridgeError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            push_url: format!("{}{}", base_url.trim_end_matches('/'), BULK_DATA_PUSH_PATH),
            handle,
        })
    }

    /// Full URL the envelopes are posted to.
    pub fn push_url(&self) -> &str {
        &self.push_url
    }

    async fn push_async(&self, body: Vec<u8>) -> Result<(), TransportError> {
        let resp = self
            .client
            .post(&self.push_url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| TransportError::Connection(format!("{}: {e}", self.push_url)))?;

        let status = resp.status();
        if status.is_client_error() || status.is_server_error() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

impl BulkDataTransport for HttpBulkDataTransport {
    fn push(&self, envelope: &DataEnvelope) -> Result<(), TransportError> {
        let body =
            serde_json::to_vec(envelope).map_err(|e| TransportError::Encode(e.to_string()))?;
        self.handle.block_on(self.push_async(body))
    }
}
