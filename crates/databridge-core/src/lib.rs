//! # databridge-core
//!
//! The ingestion pipeline for databridge - THE LOGIC.
//!
//! A client submits a `DataEnvelope` (header, body, declared MD5 checksum).
//! The pipeline verifies the checksum, persists the block, then forwards the
//! envelope to a downstream bulk-data store under a retry policy and a
//! circuit breaker.
//!
//! ## Architectural Constraints
//!
//! - Persist before forward: a forwarding failure never rolls back the write
//! - A checksum mismatch has no side effects
//! - The forwarder holds no per-call state; only breaker statistics are shared
//! - Has NO async, NO network dependencies (pure Rust). The transport is a trait.

// =============================================================================
// MODULES
// =============================================================================

pub mod checksum;
pub mod forwarder;
pub mod primitives;
pub mod server;
pub mod storage;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{BlockType, BridgeError, DataBody, DataEnvelope, DataHeader, StoredBlock};

// =============================================================================
// RE-EXPORTS: Pipeline
// =============================================================================

pub use forwarder::{
    BulkDataTransport, CallPermit, CircuitBreaker, CircuitBreakerConfig, CircuitSnapshot,
    CircuitState, EnvelopeForwarder, ForwardCause, Forwarder, ForwardingFailure, RetryPolicy,
    Sleeper, ThreadSleeper, TransportError,
};
pub use server::DataServer;
pub use storage::{BlockStore, MemoryBlockStore, RedbBlockStore, StorageBackend};
