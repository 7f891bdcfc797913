//! Key-Value Store
//!
//! The only durable state this core owns lives behind [`KeyValueStore`]: a flat
//! mapping from plain string keys to booleans and strings. Production wiring
//! supplies [`SledKeyValueStore`]; tests and ephemeral hosts use
//! [`MemoryKeyValueStore`]. [`DeadlineStore`] bounds the latency of writes
//! against any inner store.

pub mod deadline;
pub mod memory;
pub mod persistence;

pub use deadline::DeadlineStore;
pub use memory::MemoryKeyValueStore;
pub use persistence::SledKeyValueStore;

use crate::error::StorageError;

/// Key-value store interface
///
/// No transactions, no schema. A successful `set_*` must be durable before it
/// returns.
pub trait KeyValueStore: Send + Sync {
    fn get_bool(&self, key: &str) -> Result<Option<bool>, StorageError>;
    fn set_bool(&self, key: &str, value: bool) -> Result<(), StorageError>;
    fn get_string(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set_string(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Join a storage prefix and key segments with `/`.
///
/// `storage_key("appsight", &["Analytics", "IsEnabled"])` is
/// `appsight/Analytics/IsEnabled`.
pub fn storage_key(prefix: &str, segments: &[&str]) -> String {
    let mut key = prefix.to_string();
    for segment in segments {
        key.push('/');
        key.push_str(segment);
    }
    key
}
