//! # Data Server
//!
//! The ingestion orchestrator: verify, persist, forward.
//!
//! ## Save pipeline
//!
//! ```text
//! envelope ─► checksum ok? ── no ──► Ok(false)   (no store write, no push)
//!                  │
//!                 yes
//!                  ▼
//!            store.insert ─── Conflict ──► Err   (no push)
//!                  ▼
//!            forwarder.forward ── failure ──► Err(Forwarding)  (record kept)
//!                  ▼
//!               Ok(true)
//! ```
//!
//! The record is written before the push is attempted, and a forwarding
//! failure does not roll the write back.

use crate::checksum;
use crate::forwarder::EnvelopeForwarder;
use crate::storage::BlockStore;
use crate::{BlockType, BridgeError, DataEnvelope, StoredBlock};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Orchestrates the checksum verifier, the block store and the forwarder.
#[derive(Clone)]
pub struct DataServer {
    store: Arc<dyn BlockStore>,
    forwarder: Arc<dyn EnvelopeForwarder>,
}

impl std::fmt::Debug for DataServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataServer").finish_non_exhaustive()
    }
}

impl DataServer {
    pub fn new(store: Arc<dyn BlockStore>, forwarder: Arc<dyn EnvelopeForwarder>) -> Self {
        Self { store, forwarder }
    }

    /// The underlying block store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn BlockStore> {
        &self.store
    }

    /// Verify, persist and forward one envelope.
    ///
    /// Returns `Ok(false)` on checksum mismatch with no side effects. A missing
    /// checksum is treated as a mismatch.
    pub fn save_envelope(&self, envelope: &DataEnvelope) -> Result<bool, BridgeError> {
        let declared = envelope.checksum.as_deref().unwrap_or_default();
        if !checksum::verify(envelope.content(), declared) {
            info!(name = envelope.name(), "Checksum mismatch, envelope rejected");
            return Ok(false);
        }
        debug!(name = envelope.name(), "Checksum verified");

        self.store.insert(StoredBlock::from(envelope))?;
        info!(
            name = envelope.name(),
            block_type = %envelope.data_header.block_type,
            "Block persisted"
        );

        if let Err(failure) = self.forwarder.forward(envelope) {
            warn!(
                name = envelope.name(),
                attempts = failure.attempts(),
                "Block persisted but not forwarded"
            );
            return Err(failure.into());
        }
        Ok(true)
    }

    /// Every stored block of the given type, as envelopes without checksum.
    pub fn query_by_type(&self, block_type: BlockType) -> Result<Vec<DataEnvelope>, BridgeError> {
        let blocks = self.store.find_by_type(block_type)?;
        debug!(block_type = %block_type, count = blocks.len(), "Queried blocks by type");
        Ok(blocks.into_iter().map(StoredBlock::into_envelope).collect())
    }

    /// Reclassify a stored block. Fails with `NotFound` if the name is absent.
    pub fn update_by_name(&self, name: &str, block_type: BlockType) -> Result<bool, BridgeError> {
        self.store.update_type(name, block_type)?;
        info!(name = name, block_type = %block_type, "Block type updated");
        Ok(true)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::forwarder::{ForwardCause, ForwardingFailure, TransportError};
    use crate::storage::MemoryBlockStore;
    use crate::{DataBody, DataHeader};
    use parking_lot::Mutex;

    #[derive(Default)]
    struct CountingForwarder {
        forwarded: Mutex<Vec<String>>,
        fail: bool,
    }

    impl EnvelopeForwarder for CountingForwarder {
        fn forward(&self, envelope: &DataEnvelope) -> Result<(), ForwardingFailure> {
            self.forwarded.lock().push(envelope.name().to_string());
            if self.fail {
                return Err(ForwardingFailure::new(
                    ForwardCause::Transport(TransportError::Connection("down".into())),
                    1,
                ));
            }
            Ok(())
        }
    }

    fn hello(name: &str, checksum: &str) -> DataEnvelope {
        DataEnvelope::new(
            DataHeader::new(name, BlockType::BlockTypeA),
            DataBody::new("hello"),
            checksum,
        )
    }

    const HELLO_MD5: &str = "5d41402abc4b2a76b9719d911017c592";

    #[test]
    fn valid_envelope_is_stored_and_forwarded() {
        let forwarder = Arc::new(CountingForwarder::default());
        let server = DataServer::new(Arc::new(MemoryBlockStore::new()), forwarder.clone());

        assert!(server.save_envelope(&hello("A", HELLO_MD5)).unwrap());
        assert_eq!(*forwarder.forwarded.lock(), vec!["A".to_string()]);
        assert!(server.store().find_by_name("A").unwrap().is_some());
    }

    #[test]
    fn missing_checksum_is_a_mismatch() {
        let forwarder = Arc::new(CountingForwarder::default());
        let server = DataServer::new(Arc::new(MemoryBlockStore::new()), forwarder.clone());

        let mut envelope = hello("A", HELLO_MD5);
        envelope.checksum = None;
        assert!(!server.save_envelope(&envelope).unwrap());
        assert!(forwarder.forwarded.lock().is_empty());
        assert!(server.store().find_by_name("A").unwrap().is_none());
    }

    #[test]
    fn duplicate_name_is_not_forwarded() {
        let forwarder = Arc::new(CountingForwarder::default());
        let server = DataServer::new(Arc::new(MemoryBlockStore::new()), forwarder.clone());

        server.save_envelope(&hello("A", HELLO_MD5)).unwrap();
        let err = server.save_envelope(&hello("A", HELLO_MD5)).unwrap_err();

        assert!(matches!(err, BridgeError::Conflict(_)));
        assert_eq!(forwarder.forwarded.lock().len(), 1);
    }

    #[test]
    fn forwarding_failure_keeps_record() {
        let forwarder = Arc::new(CountingForwarder {
            fail: true,
            ..CountingForwarder::default()
        });
        let server = DataServer::new(Arc::new(MemoryBlockStore::new()), forwarder);

        let err = server.save_envelope(&hello("A", HELLO_MD5)).unwrap_err();
        assert!(matches!(err, BridgeError::Forwarding(_)));
        assert_eq!(server.query_by_type(BlockType::BlockTypeA).unwrap().len(), 1);
    }
}
