//! # Configuration
//!
//! Layered settings for the server, in increasing precedence:
//!
//! 1. Built-in defaults
//! 2. Optional TOML file (`--config`)
//! 3. Environment (`DATABRIDGE_BULK_DATA_URL`)
//! 4. CLI flags
//!
//! Every key in the file is optional.
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 8090
//! backend = "redb"
//! database = "databridge.redb"
//!
//! [bulk_data]
//! base_url = "http://localhost:8091"
//! timeout_ms = 10000
//!
//! [retry]
//! max_attempts = 3
//! initial_delay_ms = 500
//! multiplier = 3
//!
//! [circuit_breaker]
//! failure_rate_threshold_percent = 50
//! minimum_calls = 5
//! ```

use databridge_core::{BridgeError, CircuitBreakerConfig, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding `[bulk_data] base_url`.
pub const BULK_DATA_URL_ENV: &str = "DATABRIDGE_BULK_DATA_URL";

/// Maximum config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

// =============================================================================
// SECTIONS
// =============================================================================

/// `[server]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
    /// "redb" or "memory".
    pub backend: String,
    pub database: PathBuf,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8090,
            backend: "redb".to_string(),
            database: PathBuf::from("databridge.redb"),
        }
    }
}

/// `[bulk_data]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BulkDataSection {
    /// Base URL of the bulk-data server; the push path is appended.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout_ms: u64,
}

impl Default for BulkDataSection {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8091".to_string(),
            timeout_ms: 10_000,
        }
    }
}

// =============================================================================
// CONFIG
// =============================================================================

/// Complete server configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataBridgeConfig {
    pub server: ServerSection,
    pub bulk_data: BulkDataSection,
    pub retry: RetryPolicy,
    pub circuit_breaker: CircuitBreakerConfig,
}

impl DataBridgeConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, BridgeError> {
        toml::from_str(text).map_err(|e| BridgeError::Configuration(e.to_string()))
    }

    /// Load from an optional file. `None` yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, BridgeError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let metadata = std::fs::metadata(path).map_err(|e| {
            BridgeError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(BridgeError::Configuration(format!(
                "Config file size {} bytes exceeds maximum allowed {} bytes",
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }

        let text = std::fs::read_to_string(path).map_err(|e| {
            BridgeError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    /// Apply environment overrides.
    pub fn apply_env(&mut self) {
        if let Some(url) = std::env::var(BULK_DATA_URL_ENV)
            .ok()
            .filter(|u| !u.trim().is_empty())
        {
            tracing::info!("Bulk data URL taken from {}", BULK_DATA_URL_ENV);
            self.bulk_data.base_url = url;
        }
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), BridgeError> {
        self.retry.validate()?;
        self.circuit_breaker.validate()?;

        if self.bulk_data.base_url.trim().is_empty() {
            return Err(BridgeError::Configuration(
                "bulk_data.base_url must not be empty".to_string(),
            ));
        }
        if self.bulk_data.timeout_ms == 0 {
            return Err(BridgeError::Configuration(
                "bulk_data.timeout_ms must be at least 1".to_string(),
            ));
        }
        match self.server.backend.as_str() {
            "redb" | "memory" => Ok(()),
            other => Err(BridgeError::Configuration(format!(
                "Unknown backend: {}. Use 'redb' or 'memory'",
                other
            ))),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
