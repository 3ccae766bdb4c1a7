//! # Core Type Definitions
//!
//! This module contains the data model of the ingestion pipeline:
//! - Block classification (`BlockType`)
//! - Transfer unit (`DataHeader`, `DataBody`, `DataEnvelope`)
//! - Persisted form (`StoredBlock`)
//! - Error types (`BridgeError`)
//!
//! ## Wire Shape
//!
//! Envelopes travel as camelCase JSON:
//!
//! ```text
//! {"dataHeader":{"name":"A","blockType":"BLOCKTYPEA"},"dataBody":{"dataBody":"hello"},"checksum":"5d41..."}
//! ```
//!
//! The checksum belongs to the envelope only. A `StoredBlock` has no checksum
//! field, so an envelope rebuilt from storage always carries `None`.

use crate::forwarder::ForwardingFailure;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// BLOCK TYPE
// =============================================================================

/// Closed set of block classifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BlockType {
    #[serde(rename = "BLOCKTYPEA")]
    BlockTypeA,
    #[serde(rename = "BLOCKTYPEB")]
    BlockTypeB,
}

impl BlockType {
    /// Every variant, in tag order.
    pub const ALL: [Self; 2] = [Self::BlockTypeA, Self::BlockTypeB];

    /// Wire name of the variant.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BlockTypeA => "BLOCKTYPEA",
            Self::BlockTypeB => "BLOCKTYPEB",
        }
    }

    /// Stable one-byte tag used by the persistent type index.
    #[must_use]
    pub const fn tag(self) -> u8 {
        match self {
            Self::BlockTypeA => 0,
            Self::BlockTypeB => 1,
        }
    }

    /// Inverse of [`BlockType::tag`].
    #[must_use]
    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.tag() == tag)
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlockType {
    type Err = BridgeError;

    /// Case-sensitive match on the wire name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| BridgeError::UnknownBlockType(s.to_string()))
    }
}

// =============================================================================
// ENVELOPE
// =============================================================================

/// Identity and classification of a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataHeader {
    /// Unique block name. Immutable once stored.
    pub name: String,
    /// Classification. Mutable through an update.
    pub block_type: BlockType,
}

impl DataHeader {
    #[must_use]
    pub fn new(name: impl Into<String>, block_type: BlockType) -> Self {
        Self {
            name: name.into(),
            block_type,
        }
    }
}

/// Opaque payload of a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataBody {
    pub data_body: String,
}

impl DataBody {
    #[must_use]
    pub fn new(data_body: impl Into<String>) -> Self {
        Self {
            data_body: data_body.into(),
        }
    }
}

/// The unit of transfer and verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataEnvelope {
    pub data_header: DataHeader,
    pub data_body: DataBody,
    /// Client-declared MD5 of `data_body`, lower-case hex.
    #[serde(default)]
    pub checksum: Option<String>,
}

impl DataEnvelope {
    /// Create an envelope with a declared checksum.
    #[must_use]
    pub fn new(header: DataHeader, body: DataBody, checksum: impl Into<String>) -> Self {
        Self {
            data_header: header,
            data_body: body,
            checksum: Some(checksum.into()),
        }
    }

    /// Block name from the header.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.data_header.name
    }

    /// Body content as bytes, the input of the checksum.
    #[must_use]
    pub fn content(&self) -> &[u8] {
        self.data_body.data_body.as_bytes()
    }
}

// =============================================================================
// STORED BLOCK
// =============================================================================

/// Persisted form of a block: header fields plus body, no checksum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredBlock {
    pub name: String,
    pub block_type: BlockType,
    pub data_body: String,
}

impl StoredBlock {
    #[must_use]
    pub fn new(name: impl Into<String>, block_type: BlockType, data_body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            block_type,
            data_body: data_body.into(),
        }
    }

    /// Rebuild an envelope. The checksum is not reconstructible and is `None`.
    #[must_use]
    pub fn into_envelope(self) -> DataEnvelope {
        DataEnvelope {
            data_header: DataHeader::new(self.name, self.block_type),
            data_body: DataBody::new(self.data_body),
            checksum: None,
        }
    }
}

impl From<&DataEnvelope> for StoredBlock {
    fn from(envelope: &DataEnvelope) -> Self {
        Self {
            name: envelope.data_header.name.clone(),
            block_type: envelope.data_header.block_type,
            data_body: envelope.data_body.data_body.clone(),
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the databridge system.
///
/// A checksum mismatch is not an error: `save_envelope` returns `Ok(false)`.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The envelope failed boundary validation.
    #[error("Invalid envelope: {0}")]
    InvalidEnvelope(String),

    /// The block type is not one of the known tags.
    #[error("Unknown block type: {0}")]
    UnknownBlockType(String),

    /// A block with this name is already stored.
    #[error("Block already exists: {0}")]
    Conflict(String),

    /// No block with this name is stored.
    #[error("Block not found: {0}")]
    NotFound(String),

    /// The downstream push failed after the retry and breaker policy.
    #[error(transparent)]
    Forwarding(#[from] ForwardingFailure),

    /// Invalid configuration detected at startup.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A storage engine error occurred.
    #[error("I/O error: {0}")]
    IoError(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

// =============================================================================
// TESTS
// =============================================================================
