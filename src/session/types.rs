//! Shared session helpers: records, lookup results, timestamps and id generation.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tag attached to telemetry whose timestamp no retained session covers.
pub const UNKNOWN_SESSION_TAG: &str = "unknown";

/// One session start: an id and the offset (ms) at which it began.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: String,
    pub start_offset: u64,
}

impl SessionRecord {
    pub fn new(session_id: impl Into<String>, start_offset: u64) -> Self {
        Self {
            session_id: session_id.into(),
            start_offset,
        }
    }
}

/// Result of a point-in-time session lookup.
///
/// `Unknown` is a normal outcome: the history is empty, or the timestamp
/// precedes every retained record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionLookup {
    Known(String),
    Unknown,
}

impl SessionLookup {
    pub fn is_known(&self) -> bool {
        matches!(self, SessionLookup::Known(_))
    }

    /// The id to attach to an outgoing record.
    pub fn as_tag(&self) -> &str {
        match self {
            SessionLookup::Known(id) => id,
            SessionLookup::Unknown => UNKNOWN_SESSION_TAG,
        }
    }

    pub fn into_option(self) -> Option<String> {
        match self {
            SessionLookup::Known(id) => Some(id),
            SessionLookup::Unknown => None,
        }
    }
}

impl fmt::Display for SessionLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// Current wall-clock time as milliseconds since the Unix epoch.
///
/// Stable across restarts, so it can serve as the offset epoch when the
/// session history is persisted.
pub fn now_millis() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
}

/// Generate a globally unique session id.
pub fn new_session_id() -> String {
    Uuid::new_v4().to_string()
}
