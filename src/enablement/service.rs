//! Enablement state of a single service.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::enablement::EnablementListener;
use crate::error::CoreError;
use crate::store::{storage_key, KeyValueStore};

pub const IS_ENABLED_KEY: &str = "IsEnabled";

/// Cached, durable enabled flag for one service.
///
/// Reads are a single atomic load. Writes persist first and only then update
/// the cache, so a reported success always means cache and store agree.
pub struct ServiceEnablement {
    name: String,
    key: String,
    store: Arc<dyn KeyValueStore>,
    enabled: AtomicBool,
    write_lock: Mutex<()>,
    listeners: RwLock<Vec<Arc<dyn EnablementListener>>>,
}

impl ServiceEnablement {
    /// Construct a handle for `name` under `prefix`, seeding the cache from
    /// the store (absent value resolves to `default_enabled`).
    pub fn with_storage(
        name: &str,
        prefix: &str,
        default_enabled: bool,
        store: Arc<dyn KeyValueStore>,
    ) -> Result<Self, CoreError> {
        validate_service_name(name)?;
        let key = storage_key(prefix, &[name, IS_ENABLED_KEY]);
        let persisted = store.get_bool(&key)?;
        let enabled = persisted.unwrap_or(default_enabled);
        debug!(service = %name, key = %key, enabled, persisted = persisted.is_some(), "service enablement loaded");

        Ok(Self {
            name: name.to_string(),
            key,
            store,
            enabled: AtomicBool::new(enabled),
            write_lock: Mutex::new(()),
            listeners: RwLock::new(Vec::new()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn add_listener(&self, listener: Arc<dyn EnablementListener>) {
        self.listeners.write().push(listener);
    }

    /// Persist and apply a new state, then notify listeners.
    ///
    /// Setting the current value again is a no-op. If the write fails the
    /// cached value is unchanged. Behind a [`DeadlineStore`] a timed-out write
    /// stays queued and may still land, so after a restart the service can
    /// read the value this call reported as failed until a later write
    /// succeeds.
    ///
    /// [`DeadlineStore`]: crate::store::DeadlineStore
    pub fn set_enabled(&self, enabled: bool) -> Result<(), CoreError> {
        let _guard = self.write_lock.lock();
        if self.is_enabled() == enabled {
            debug!(service = %self.name, enabled, "enablement unchanged");
            return Ok(());
        }

        if let Err(err) = self.store.set_bool(&self.key, enabled) {
            warn!(service = %self.name, key = %self.key, error = %err, "failed to persist enablement");
            return Err(err.into());
        }
        self.enabled.store(enabled, Ordering::SeqCst);
        info!(service = %self.name, enabled, "service enablement changed");

        for listener in self.listeners.read().iter() {
            listener.on_enablement_changed(&self.name, enabled);
        }
        Ok(())
    }
}

impl std::fmt::Debug for ServiceEnablement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceEnablement")
            .field("name", &self.name)
            .field("key", &self.key)
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

/// Service names become key segments, so they must not contain `/`.
pub(crate) fn validate_service_name(name: &str) -> Result<(), CoreError> {
    if name.is_empty() || name.contains('/') || name.trim() != name {
        return Err(CoreError::InvalidServiceName(name.to_string()));
    }
    Ok(())
}
