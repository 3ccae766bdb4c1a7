//! # Block Store
//!
//! Durable keyed storage of blocks, addressable by name and queryable by type.
//!
//! The store adds no business logic beyond key uniqueness on insert and
//! existence on update. Both operations are atomic per key in every engine.
//!
//! ## Engines
//!
//! - `MemoryBlockStore`: `BTreeMap` behind a lock (fast, volatile)
//! - `RedbBlockStore`: redb database (ACID, persistent)
//!
//! `StorageBackend` selects one of the two at startup.

mod memory;
mod redb_store;

pub use memory::MemoryBlockStore;
pub use redb_store::RedbBlockStore;

use crate::{BlockType, BridgeError, StoredBlock};
use std::collections::BTreeMap;
use std::path::Path;

// =============================================================================
// BLOCKSTORE TRAIT
// =============================================================================

/// Record operations the ingestion pipeline needs from a storage engine.
///
/// Methods take `&self`: engines synchronize internally so concurrent requests
/// can share one store.
pub trait BlockStore: Send + Sync {
    /// Insert a new block.
    ///
    /// Fails with `BridgeError::Conflict` if the name is already stored.
    fn insert(&self, block: StoredBlock) -> Result<(), BridgeError>;

    /// All blocks of the given type. Empty if none match. Order is unspecified.
    fn find_by_type(&self, block_type: BlockType) -> Result<Vec<StoredBlock>, BridgeError>;

    /// The block with the given name, if stored.
    fn find_by_name(&self, name: &str) -> Result<Option<StoredBlock>, BridgeError>;

    /// Reclassify a stored block.
    ///
    /// Fails with `BridgeError::NotFound` and leaves the store untouched if the
    /// name is absent.
    fn update_type(&self, name: &str, block_type: BlockType) -> Result<(), BridgeError>;

    /// Number of stored blocks per type. Every type is present, possibly with 0.
    fn count_by_type(&self) -> Result<BTreeMap<BlockType, usize>, BridgeError> {
        let mut counts = BTreeMap::new();
        for block_type in BlockType::ALL {
            counts.insert(block_type, self.find_by_type(block_type)?.len());
        }
        Ok(counts)
    }
}

// =============================================================================
// STORAGE BACKEND
// =============================================================================

/// Storage engine chosen at startup.
#[derive(Debug)]
pub enum StorageBackend {
    /// In-memory map (fast, volatile).
    Memory(MemoryBlockStore),
    /// Disk-backed store using redb (ACID, persistent).
    Persistent(RedbBlockStore),
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::Memory(MemoryBlockStore::new())
    }
}

impl StorageBackend {
    /// Create a volatile in-memory backend.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open or create a redb-backed store at the given path.
    pub fn with_redb(path: impl AsRef<Path>) -> Result<Self, BridgeError> {
        Ok(Self::Persistent(RedbBlockStore::open(path)?))
    }

    /// Whether writes survive a restart.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self, Self::Persistent(_))
    }

    fn engine(&self) -> &dyn BlockStore {
        match self {
            Self::Memory(store) => store,
            Self::Persistent(store) => store,
        }
    }
}

impl BlockStore for StorageBackend {
    fn insert(&self, block: StoredBlock) -> Result<(), BridgeError> {
        self.engine().insert(block)
    }

    fn find_by_type(&self, block_type: BlockType) -> Result<Vec<StoredBlock>, BridgeError> {
        self.engine().find_by_type(block_type)
    }

    fn find_by_name(&self, name: &str) -> Result<Option<StoredBlock>, BridgeError> {
        self.engine().find_by_name(name)
    }

    fn update_type(&self, name: &str, block_type: BlockType) -> Result<(), BridgeError> {
        self.engine().update_type(name, block_type)
    }
}
