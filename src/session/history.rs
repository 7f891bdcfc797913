//! Bounded, time-ordered window of recent sessions.
//!
//! Records are kept sorted by `start_offset` because appends must never go
//! backwards; lookups are a predecessor search over that order. Once the
//! window exceeds its capacity the oldest record is evicted, and events older
//! than the window resolve to [`SessionLookup::Unknown`].

use std::collections::VecDeque;

use parking_lot::RwLock;
use tracing::warn;

use crate::error::CoreError;
use crate::session::types::{SessionLookup, SessionRecord};

pub const DEFAULT_HISTORY_CAPACITY: usize = 5;

#[derive(Debug)]
pub struct SessionHistory {
    capacity: usize,
    records: RwLock<VecDeque<SessionRecord>>,
}

impl SessionHistory {
    /// Create an empty history. A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            records: RwLock::new(VecDeque::with_capacity(capacity + 1)),
        }
    }

    /// Rebuild a history from previously persisted records.
    ///
    /// Only the newest `capacity` records are kept. Records must already be
    /// in non-decreasing offset order with unique ids.
    pub fn from_records(capacity: usize, records: Vec<SessionRecord>) -> Result<Self, CoreError> {
        let history = Self::new(capacity);
        for record in records {
            history.append(record.session_id, record.start_offset)?;
        }
        Ok(history)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Append a session start, evicting the oldest record when over capacity.
    pub fn append(&self, session_id: impl Into<String>, start_offset: u64) -> Result<(), CoreError> {
        let session_id = session_id.into();
        let mut records = self.records.write();
        check_append(&records, &session_id, start_offset)?;

        records.push_back(SessionRecord {
            session_id,
            start_offset,
        });
        while records.len() > self.capacity {
            records.pop_front();
        }
        Ok(())
    }

    /// The records `append` would leave behind for `record`, without applying
    /// it. Fails exactly when `append` would.
    pub fn with_appended(&self, record: &SessionRecord) -> Result<Vec<SessionRecord>, CoreError> {
        let records = self.records.read();
        check_append(&records, &record.session_id, record.start_offset)?;

        let skip = (records.len() + 1).saturating_sub(self.capacity);
        let mut next: Vec<SessionRecord> = records.iter().skip(skip).cloned().collect();
        next.push(record.clone());
        Ok(next)
    }

    /// Start offset of the most recently appended session.
    pub fn last_start_offset(&self) -> Option<u64> {
        self.records.read().back().map(|r| r.start_offset)
    }

    /// Id of the latest session that had started at `timestamp`.
    pub fn session_id_at(&self, timestamp: u64) -> SessionLookup {
        let records = self.records.read();
        let idx = records.partition_point(|r| r.start_offset <= timestamp);
        if idx == 0 {
            return SessionLookup::Unknown;
        }
        SessionLookup::Known(records[idx - 1].session_id.clone())
    }

    /// Id of the most recently appended session.
    pub fn current_session_id(&self) -> SessionLookup {
        match self.records.read().back() {
            Some(record) => SessionLookup::Known(record.session_id.clone()),
            None => SessionLookup::Unknown,
        }
    }

    /// Ordered copy of the retained records, oldest first.
    pub fn snapshot(&self) -> Vec<SessionRecord> {
        self.records.read().iter().cloned().collect()
    }

    pub fn clear(&self) {
        self.records.write().clear();
    }
}

fn check_append(
    records: &VecDeque<SessionRecord>,
    session_id: &str,
    start_offset: u64,
) -> Result<(), CoreError> {
    if let Some(last) = records.back() {
        if start_offset < last.start_offset {
            warn!(
                session_id = %session_id,
                start_offset,
                last_offset = last.start_offset,
                "rejecting out-of-order session start"
            );
            return Err(CoreError::OutOfOrderSession {
                start_offset,
                last_offset: last.start_offset,
            });
        }
    }
    if records.iter().any(|r| r.session_id == session_id) {
        return Err(CoreError::DuplicateSession(session_id.to_string()));
    }
    Ok(())
}

impl Default for SessionHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}
