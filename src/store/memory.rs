//! In-memory key-value store for tests and hosts without durable storage.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::error::StorageError;
use crate::store::KeyValueStore;

#[derive(Debug, Clone, PartialEq, Eq)]
enum StoredValue {
    Bool(bool),
    Text(String),
}

#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: RwLock<HashMap<String, StoredValue>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get_bool(&self, key: &str) -> Result<Option<bool>, StorageError> {
        match self.entries.read().get(key) {
            Some(StoredValue::Bool(value)) => Ok(Some(*value)),
            _ => Ok(None),
        }
    }

    fn set_bool(&self, key: &str, value: bool) -> Result<(), StorageError> {
        self.entries
            .write()
            .insert(key.to_string(), StoredValue::Bool(value));
        Ok(())
    }

    fn get_string(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self.entries.read().get(key) {
            Some(StoredValue::Text(value)) => Ok(Some(value.clone())),
            _ => Ok(None),
        }
    }

    fn set_string(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .write()
            .insert(key.to_string(), StoredValue::Text(value.to_string()));
        Ok(())
    }
}
