//! # redb-backed Block Store
//!
//! A disk-backed block store using the redb embedded database, providing:
//! - ACID transactions
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//!
//! ## Layout
//!
//! - `blocks`: name -> postcard-encoded `StoredBlock`
//! - `blocks_by_type`: type tag -> name (multimap secondary index)
//!
//! Insert and update touch both tables inside one write transaction. redb
//! serializes writers, so the existence checks cannot race.

use super::BlockStore;
use crate::{BlockType, BridgeError, StoredBlock};
use redb::{Database, MultimapTableDefinition, ReadableDatabase, ReadableTable, TableDefinition};
use std::path::Path;

/// Table for blocks: name -> serialized StoredBlock bytes
const BLOCKS: TableDefinition<&str, &[u8]> = TableDefinition::new("blocks");

/// Secondary index: BlockType tag -> names of blocks with that type
const BLOCKS_BY_TYPE: MultimapTableDefinition<u8, &str> =
    MultimapTableDefinition::new("blocks_by_type");

fn io_err(e: impl std::fmt::Display) -> BridgeError {
    BridgeError::IoError(e.to_string())
}

fn decode(bytes: &[u8]) -> Result<StoredBlock, BridgeError> {
    postcard::from_bytes(bytes).map_err(|e| BridgeError::SerializationError(e.to_string()))
}

fn encode(block: &StoredBlock) -> Result<Vec<u8>, BridgeError> {
    postcard::to_allocvec(block).map_err(|e| BridgeError::SerializationError(e.to_string()))
}

/// A disk-backed block store using redb.
pub struct RedbBlockStore {
    db: Database,
}

impl std::fmt::Debug for RedbBlockStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbBlockStore").finish_non_exhaustive()
    }
}

impl RedbBlockStore {
    /// Open or create a block database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, BridgeError> {
        let db = Database::create(path.as_ref()).map_err(io_err)?;

        // Initialize tables if they don't exist
        let write_txn = db.begin_write().map_err(io_err)?;
        {
            let _ = write_txn.open_table(BLOCKS).map_err(io_err)?;
            let _ = write_txn.open_multimap_table(BLOCKS_BY_TYPE).map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)?;

        Ok(Self { db })
    }
}

impl BlockStore for RedbBlockStore {
    fn insert(&self, block: StoredBlock) -> Result<(), BridgeError> {
        let bytes = encode(&block)?;
        let write_txn = self.db.begin_write().map_err(io_err)?;

        let exists = {
            let blocks = write_txn.open_table(BLOCKS).map_err(io_err)?;
            let existing = blocks.get(block.name.as_str()).map_err(io_err)?;
            existing.is_some()
        };
        if exists {
            write_txn.abort().map_err(io_err)?;
            return Err(BridgeError::Conflict(block.name));
        }

        {
            let mut blocks = write_txn.open_table(BLOCKS).map_err(io_err)?;
            blocks
                .insert(block.name.as_str(), bytes.as_slice())
                .map_err(io_err)?;
            let mut index = write_txn
                .open_multimap_table(BLOCKS_BY_TYPE)
                .map_err(io_err)?;
            index
                .insert(block.block_type.tag(), block.name.as_str())
                .map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)?;
        Ok(())
    }

    fn find_by_type(&self, block_type: BlockType) -> Result<Vec<StoredBlock>, BridgeError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let index = read_txn
            .open_multimap_table(BLOCKS_BY_TYPE)
            .map_err(io_err)?;
        let blocks = read_txn.open_table(BLOCKS).map_err(io_err)?;

        let mut found = Vec::new();
        for entry in index.get(block_type.tag()).map_err(io_err)? {
            let name = entry.map_err(io_err)?;
            if let Some(data) = blocks.get(name.value()).map_err(io_err)? {
                found.push(decode(data.value())?);
            }
        }
        Ok(found)
    }

    fn find_by_name(&self, name: &str) -> Result<Option<StoredBlock>, BridgeError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let blocks = read_txn.open_table(BLOCKS).map_err(io_err)?;

        match blocks.get(name).map_err(io_err)? {
            Some(data) => Ok(Some(decode(data.value())?)),
            None => Ok(None),
        }
    }

    fn update_type(&self, name: &str, block_type: BlockType) -> Result<(), BridgeError> {
        let write_txn = self.db.begin_write().map_err(io_err)?;

        let current = {
            let blocks = write_txn.open_table(BLOCKS).map_err(io_err)?;
            let existing = blocks.get(name).map_err(io_err)?;
            existing.map(|data| data.value().to_vec())
        };
        let Some(bytes) = current else {
            write_txn.abort().map_err(io_err)?;
            return Err(BridgeError::NotFound(name.to_string()));
        };

        let mut block = decode(&bytes)?;
        let previous = block.block_type;
        block.block_type = block_type;
        let encoded = encode(&block)?;

        {
            let mut blocks = write_txn.open_table(BLOCKS).map_err(io_err)?;
            blocks.insert(name, encoded.as_slice()).map_err(io_err)?;
            let mut index = write_txn
                .open_multimap_table(BLOCKS_BY_TYPE)
                .map_err(io_err)?;
            index.remove(previous.tag(), name).map_err(io_err)?;
            index.insert(block_type.tag(), name).map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)?;
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
