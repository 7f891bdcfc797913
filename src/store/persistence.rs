//! Persistence layer: sled-backed key-value store

use crate::error::{io_other, StorageError};
use crate::store::KeyValueStore;
use sled::{Db, Tree};
use std::path::Path;

const TREE_BOOLS: &str = "kv_bool";
const TREE_STRINGS: &str = "kv_string";

/// Sled-based implementation of KeyValueStore
///
/// Booleans and strings live in separate trees so a key can never be read
/// back as the wrong type. Every write is flushed before returning.
#[derive(Clone)]
pub struct SledKeyValueStore {
    db: Db,
    bools: Tree,
    strings: Tree,
}

impl SledKeyValueStore {
    /// Open (or create) a store at the given directory
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = sled::open(path).map_err(|e| io_other("Failed to open sled database", e))?;
        Self::new(db)
    }

    /// Wrap an already opened database
    pub fn new(db: Db) -> Result<Self, StorageError> {
        let bools = db.open_tree(TREE_BOOLS).map_err(to_storage_io)?;
        let strings = db.open_tree(TREE_STRINGS).map_err(to_storage_io)?;
        Ok(Self { db, bools, strings })
    }

    /// Get the underlying sled database (for advanced operations)
    pub fn db(&self) -> &Db {
        &self.db
    }

    /// Flush all pending writes to disk
    pub fn flush(&self) -> Result<(), StorageError> {
        self.db
            .flush()
            .map_err(|e| io_other("Failed to flush database", e))?;
        Ok(())
    }
}

impl KeyValueStore for SledKeyValueStore {
    fn get_bool(&self, key: &str) -> Result<Option<bool>, StorageError> {
        let Some(raw) = self.bools.get(key.as_bytes()).map_err(to_storage_io)? else {
            return Ok(None);
        };
        match &*raw {
            [0] => Ok(Some(false)),
            [1] => Ok(Some(true)),
            other => Err(StorageError::InvalidValue {
                key: key.to_string(),
                reason: format!("expected a single 0/1 byte, found {} bytes", other.len()),
            }),
        }
    }

    fn set_bool(&self, key: &str, value: bool) -> Result<(), StorageError> {
        self.bools
            .insert(key.as_bytes(), vec![u8::from(value)])
            .map_err(to_storage_io)?;
        self.flush()
    }

    fn get_string(&self, key: &str) -> Result<Option<String>, StorageError> {
        let Some(raw) = self.strings.get(key.as_bytes()).map_err(to_storage_io)? else {
            return Ok(None);
        };
        let value = String::from_utf8(raw.to_vec()).map_err(|e| StorageError::InvalidValue {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Some(value))
    }

    fn set_string(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.strings
            .insert(key.as_bytes(), value.as_bytes())
            .map_err(to_storage_io)?;
        self.flush()
    }
}

fn to_storage_io(err: sled::Error) -> StorageError {
    io_other("sled", err)
}
