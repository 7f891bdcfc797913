//! Core facade: one store, one session tracker and one enablement ledger,
//! wired from configuration and shared by reference with the host.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::{ConfigLoader, CoreConfig};
use crate::enablement::EnablementLedger;
use crate::error::CoreError;
use crate::session::{ActivityOutcome, HistoryStore, SessionHistory, SessionLookup, SessionTracker};
use crate::store::{DeadlineStore, KeyValueStore, SledKeyValueStore};

/// Service whose enablement governs session tracking.
pub const SESSIONS_SERVICE: &str = "Sessions";

pub struct TelemetryCore {
    config: CoreConfig,
    store: Arc<dyn KeyValueStore>,
    tracker: Arc<SessionTracker>,
    ledger: Arc<EnablementLedger>,
}

impl TelemetryCore {
    /// Load configuration for `app_root` and open the sled store it names.
    pub fn open(app_root: &Path) -> Result<Self, CoreError> {
        let config = ConfigLoader::load(app_root)?;
        Self::from_config(config)
    }

    /// Open the sled store named by `config`.
    pub fn from_config(config: CoreConfig) -> Result<Self, CoreError> {
        let path = config.storage.resolve_path()?;
        let store = SledKeyValueStore::open(&path)?;
        info!(path = %path.display(), "opened appsight store");
        Self::with_store(config, Arc::new(store))
    }

    /// Build the core against an injected store.
    pub fn with_store(config: CoreConfig, store: Arc<dyn KeyValueStore>) -> Result<Self, CoreError> {
        let config = config.validated()?;
        let store: Arc<dyn KeyValueStore> = match config.enablement.write_timeout() {
            Some(timeout) => Arc::new(DeadlineStore::new(store, timeout)?),
            None => store,
        };

        let session = &config.session;
        let tracker = if session.persist_history {
            SessionTracker::with_persistence(
                session.history_capacity,
                session.idle_threshold_ms,
                HistoryStore::new(Arc::clone(&store), &config.storage_prefix),
            )?
        } else {
            SessionTracker::new(
                Arc::new(SessionHistory::new(session.history_capacity)),
                session.idle_threshold_ms,
            )
        };
        let tracker = Arc::new(tracker);

        let ledger = Arc::new(EnablementLedger::with_defaults(
            Arc::clone(&store),
            config.storage_prefix.clone(),
            config.enablement.defaults.clone(),
        ));

        let sessions = ledger.service(SESSIONS_SERVICE)?;
        if !sessions.is_enabled() {
            tracker.stop();
        }
        sessions.add_listener(tracker.clone());
        debug!(
            prefix = %config.storage_prefix,
            sessions_enabled = sessions.is_enabled(),
            "telemetry core ready"
        );

        Ok(Self {
            config,
            store,
            tracker,
            ledger,
        })
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    pub fn tracker(&self) -> &Arc<SessionTracker> {
        &self.tracker
    }

    pub fn ledger(&self) -> &Arc<EnablementLedger> {
        &self.ledger
    }

    pub fn on_activity(&self, now: u64) -> Result<ActivityOutcome, CoreError> {
        self.tracker.on_activity(now)
    }

    pub fn session_id(&self, timestamp: u64) -> SessionLookup {
        self.tracker.session_id(timestamp)
    }

    pub fn is_enabled(&self, service: &str) -> Result<bool, CoreError> {
        self.ledger.is_enabled(service)
    }

    pub fn set_enabled(&self, service: &str, enabled: bool) -> Result<(), CoreError> {
        self.ledger.set_enabled(service, enabled)
    }

    /// Enable or disable every registered service, session tracking included.
    pub fn set_all_enabled(&self, enabled: bool) -> Result<(), CoreError> {
        self.ledger.set_all_enabled(enabled)
    }

    /// Session to attach to an event `service` produced at `timestamp`, or
    /// `None` when the service is disabled and the event must be dropped.
    pub fn enrich(&self, service: &str, timestamp: u64) -> Result<Option<SessionLookup>, CoreError> {
        if !self.ledger.is_enabled(service)? {
            return Ok(None);
        }
        Ok(Some(self.tracker.session_id(timestamp)))
    }
}
