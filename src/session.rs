//! Session domain: bounded history, persistence and the activity-driven tracker.

pub mod history;
pub mod persist;
pub mod tracker;
mod types;

pub use history::{SessionHistory, DEFAULT_HISTORY_CAPACITY};
pub use persist::{HistoryStore, SESSION_HISTORY_KEY};
pub use tracker::{ActivityOutcome, SessionListener, SessionTracker, DEFAULT_IDLE_THRESHOLD_MS};
pub use types::{new_session_id, now_millis, SessionLookup, SessionRecord, UNKNOWN_SESSION_TAG};
