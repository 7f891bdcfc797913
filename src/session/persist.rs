//! Durable copy of the session history under `<prefix>/SessionHistory`.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::StorageError;
use crate::session::types::SessionRecord;
use crate::store::{storage_key, KeyValueStore};

pub const SESSION_HISTORY_KEY: &str = "SessionHistory";

#[derive(Clone)]
pub struct HistoryStore {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl HistoryStore {
    pub fn new(store: Arc<dyn KeyValueStore>, prefix: &str) -> Self {
        Self {
            store,
            key: storage_key(prefix, &[SESSION_HISTORY_KEY]),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Load persisted records, oldest first.
    ///
    /// A value that no longer parses is logged and treated as empty; only
    /// store failures are errors.
    pub fn load(&self) -> Result<Vec<SessionRecord>, StorageError> {
        let Some(raw) = self.store.get_string(&self.key)? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str::<Vec<SessionRecord>>(&raw) {
            Ok(records) => {
                debug!(key = %self.key, count = records.len(), "loaded session history");
                Ok(records)
            }
            Err(err) => {
                warn!(key = %self.key, error = %err, "discarding unreadable session history");
                Ok(Vec::new())
            }
        }
    }

    pub fn save(&self, records: &[SessionRecord]) -> Result<(), StorageError> {
        let value = serde_json::to_string(records).map_err(to_storage_data)?;
        self.store.set_string(&self.key, &value)
    }
}

fn to_storage_data(err: serde_json::Error) -> StorageError {
    StorageError::IoError(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        err.to_string(),
    ))
}
