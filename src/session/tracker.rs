//! Session lifecycle: renewal rule, id minting and session-id queries.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::enablement::EnablementListener;
use crate::error::CoreError;
use crate::session::history::SessionHistory;
use crate::session::persist::HistoryStore;
use crate::session::types::{new_session_id, SessionLookup, SessionRecord};

pub const DEFAULT_IDLE_THRESHOLD_MS: u64 = 20_000;

/// Notified synchronously, in mint order, whenever a new session starts.
///
/// Called while the tracker serializes activity, so implementations must not
/// call [`SessionTracker::on_activity`].
pub trait SessionListener: Send + Sync {
    fn on_session_started(&self, record: &SessionRecord);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityOutcome {
    /// A new session was minted at this activity.
    Started(SessionRecord),
    /// The activity fell inside the current session.
    Continued(String),
    /// Tracking is stopped.
    Ignored,
}

#[derive(Debug)]
struct TrackerState {
    started: bool,
    last_activity: Option<u64>,
    /// Set when the previous mint failed; the next activity mints again.
    pending_mint: bool,
    /// Last start offset of a history restored from the store, until the
    /// first session of this process is minted.
    restored_until: Option<u64>,
}

pub struct SessionTracker {
    history: Arc<SessionHistory>,
    idle_threshold_ms: u64,
    persistence: Option<HistoryStore>,
    state: Mutex<TrackerState>,
    listeners: RwLock<Vec<Arc<dyn SessionListener>>>,
}

impl SessionTracker {
    /// Tracker over an in-memory history only.
    pub fn new(history: Arc<SessionHistory>, idle_threshold_ms: u64) -> Self {
        Self {
            history,
            idle_threshold_ms,
            persistence: None,
            state: Mutex::new(TrackerState {
                started: true,
                last_activity: None,
                pending_mint: false,
                restored_until: None,
            }),
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Tracker whose history is restored from, and saved to, `persistence`.
    ///
    /// Restored records keep serving retroactive lookups; the first activity
    /// after construction always starts a new session. If that activity is
    /// earlier than the newest restored session (the clock restarted, e.g.
    /// it counts from device boot), the restored window is discarded.
    pub fn with_persistence(
        capacity: usize,
        idle_threshold_ms: u64,
        persistence: HistoryStore,
    ) -> Result<Self, CoreError> {
        let records = persistence.load()?;
        let count = records.len();
        let history = match SessionHistory::from_records(capacity, records) {
            Ok(history) => history,
            Err(err) => {
                warn!(key = %persistence.key(), error = %err, "persisted session history is inconsistent, starting empty");
                SessionHistory::new(capacity)
            }
        };
        debug!(restored = count, retained = history.len(), "session history restored");

        let mut tracker = Self::new(Arc::new(history), idle_threshold_ms);
        tracker.state.get_mut().restored_until = tracker.history.last_start_offset();
        tracker.persistence = Some(persistence);
        Ok(tracker)
    }

    pub fn history(&self) -> &Arc<SessionHistory> {
        &self.history
    }

    pub fn idle_threshold_ms(&self) -> u64 {
        self.idle_threshold_ms
    }

    pub fn add_listener(&self, listener: Arc<dyn SessionListener>) {
        self.listeners.write().push(listener);
    }

    /// Record user activity at `now`, starting a new session when the idle
    /// gap since the previous activity is at least the threshold.
    ///
    /// A new session is saved before it becomes visible. If saving fails the
    /// error is returned, the history is left unchanged and the next activity
    /// tries to start a session again.
    pub fn on_activity(&self, now: u64) -> Result<ActivityOutcome, CoreError> {
        let mut state = self.state.lock();
        if !state.started {
            return Ok(ActivityOutcome::Ignored);
        }

        let expired = state.pending_mint
            || match state.last_activity {
                None => true,
                Some(last) => now.saturating_sub(last) >= self.idle_threshold_ms,
            };

        let outcome = match self.history.current_session_id() {
            SessionLookup::Known(current) if !expired => Ok(ActivityOutcome::Continued(current)),
            _ => self.mint(&mut state, now).map(ActivityOutcome::Started),
        };

        state.pending_mint = outcome.is_err();
        // Concurrent callers may deliver slightly reordered timestamps.
        state.last_activity = Some(state.last_activity.map_or(now, |last| last.max(now)));

        if let Ok(ActivityOutcome::Started(record)) = &outcome {
            info!(session_id = %record.session_id, start_offset = now, "session started");
            for listener in self.listeners.read().iter() {
                listener.on_session_started(record);
            }
        }
        outcome
    }

    fn mint(&self, state: &mut TrackerState, now: u64) -> Result<SessionRecord, CoreError> {
        let record = SessionRecord::new(new_session_id(), now);
        let stale_restore = state.restored_until.filter(|&last| now < last);
        let next = match stale_restore {
            Some(_) => vec![record.clone()],
            None => self.history.with_appended(&record)?,
        };

        if let Some(persistence) = &self.persistence {
            if let Err(err) = persistence.save(&next) {
                warn!(key = %persistence.key(), error = %err, "failed to persist session history");
                return Err(err.into());
            }
        }

        if let Some(restored_until) = stale_restore {
            warn!(
                restored_until,
                now, "clock is behind the restored session history, discarding it"
            );
            self.history.clear();
        }
        self.history.append(record.session_id.clone(), record.start_offset)?;
        state.restored_until = None;
        Ok(record)
    }

    /// Session id active at `timestamp`, for enriching an event logged then.
    pub fn session_id(&self, timestamp: u64) -> SessionLookup {
        self.history.session_id_at(timestamp)
    }

    pub fn current_session_id(&self) -> SessionLookup {
        self.history.current_session_id()
    }

    pub fn start(&self) {
        let mut state = self.state.lock();
        if !state.started {
            state.started = true;
            debug!("session tracking started");
        }
    }

    /// Stop tracking. The next activity after [`start`](Self::start) mints a
    /// new session.
    pub fn stop(&self) {
        let mut state = self.state.lock();
        state.started = false;
        state.last_activity = None;
        debug!("session tracking stopped");
    }

    pub fn is_started(&self) -> bool {
        self.state.lock().started
    }

    /// Forget every retained session, in the store and then in memory.
    pub fn clear_sessions(&self) -> Result<(), CoreError> {
        let mut state = self.state.lock();
        if let Some(persistence) = &self.persistence {
            persistence.save(&[])?;
        }
        self.history.clear();
        state.restored_until = None;
        Ok(())
    }
}

impl EnablementListener for SessionTracker {
    fn on_enablement_changed(&self, service: &str, enabled: bool) {
        if enabled {
            self.start();
            return;
        }
        self.stop();
        if let Err(err) = self.clear_sessions() {
            warn!(service = %service, error = %err, "failed to clear sessions after disable");
        }
    }
}
