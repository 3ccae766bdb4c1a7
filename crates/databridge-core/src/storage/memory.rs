//! # In-Memory Block Store
//!
//! Volatile engine backed by a `BTreeMap` keyed by block name.

use super::BlockStore;
use crate::{BlockType, BridgeError, StoredBlock};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

/// Volatile block store.
///
/// A single `RwLock` guards the map, so insert-if-absent and update-if-present
/// are atomic per key.
#[derive(Debug, Default)]
pub struct MemoryBlockStore {
    blocks: RwLock<BTreeMap<String, StoredBlock>>,
}

impl MemoryBlockStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blocks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.read().len()
    }

    /// Whether the store holds no blocks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.read().is_empty()
    }
}

impl BlockStore for MemoryBlockStore {
    fn insert(&self, block: StoredBlock) -> Result<(), BridgeError> {
        let mut blocks = self.blocks.write();
        match blocks.entry(block.name.clone()) {
            Entry::Occupied(_) => Err(BridgeError::Conflict(block.name)),
            Entry::Vacant(slot) => {
                slot.insert(block);
                Ok(())
            }
        }
    }

    fn find_by_type(&self, block_type: BlockType) -> Result<Vec<StoredBlock>, BridgeError> {
        Ok(self
            .blocks
            .read()
            .values()
            .filter(|b| b.block_type == block_type)
            .cloned()
            .collect())
    }

    fn find_by_name(&self, name: &str) -> Result<Option<StoredBlock>, BridgeError> {
        Ok(self.blocks.read().get(name).cloned())
    }

    fn update_type(&self, name: &str, block_type: BlockType) -> Result<(), BridgeError> {
        let mut blocks = self.blocks.write();
        let block = blocks
            .get_mut(name)
            .ok_or_else(|| BridgeError::NotFound(name.to_string()))?;
        block.block_type = block_type;
        Ok(())
    }
}
