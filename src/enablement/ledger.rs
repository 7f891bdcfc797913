//! Registry of per-service enablement entries sharing one store.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::enablement::service::{validate_service_name, ServiceEnablement};
use crate::enablement::EnablementListener;
use crate::error::CoreError;
use crate::store::KeyValueStore;

/// Entries are created lazily on first use. The registry lock is only held
/// to find or insert an entry, never across a store read. Every write runs
/// under that entry's own lock, so different services never block each other.
pub struct EnablementLedger {
    store: Arc<dyn KeyValueStore>,
    prefix: String,
    defaults: HashMap<String, bool>,
    services: RwLock<HashMap<String, Arc<ServiceEnablement>>>,
}

impl EnablementLedger {
    pub fn new(store: Arc<dyn KeyValueStore>, prefix: impl Into<String>) -> Self {
        Self::with_defaults(store, prefix, HashMap::new())
    }

    /// Ledger whose services default to the given values instead of `true`
    /// when nothing has been persisted for them.
    pub fn with_defaults(
        store: Arc<dyn KeyValueStore>,
        prefix: impl Into<String>,
        defaults: HashMap<String, bool>,
    ) -> Self {
        Self {
            store,
            prefix: prefix.into(),
            defaults,
            services: RwLock::new(HashMap::new()),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Configured default for `service`, `true` when unconfigured.
    ///
    /// Falls back to a case-insensitive match since config keys may arrive
    /// lowercased.
    pub fn default_for(&self, service: &str) -> bool {
        self.defaults
            .get(service)
            .or_else(|| {
                self.defaults
                    .iter()
                    .find(|(name, _)| name.eq_ignore_ascii_case(service))
                    .map(|(_, value)| value)
            })
            .copied()
            .unwrap_or(true)
    }

    /// Get or create the entry for `name`.
    ///
    /// A new entry reads its persisted value before the registry lock is
    /// taken, so a slow read never stalls lookups of other services. If two
    /// callers race to create the same entry, the first insert wins.
    pub fn service(&self, name: &str) -> Result<Arc<ServiceEnablement>, CoreError> {
        if let Some(existing) = self.services.read().get(name) {
            return Ok(Arc::clone(existing));
        }
        validate_service_name(name)?;

        let entry = Arc::new(ServiceEnablement::with_storage(
            name,
            &self.prefix,
            self.default_for(name),
            Arc::clone(&self.store),
        )?);
        let mut services = self.services.write();
        if let Some(existing) = services.get(name) {
            return Ok(Arc::clone(existing));
        }
        services.insert(name.to_string(), Arc::clone(&entry));
        debug!(service = %name, "service registered");
        Ok(entry)
    }

    pub fn is_enabled(&self, name: &str) -> Result<bool, CoreError> {
        Ok(self.service(name)?.is_enabled())
    }

    /// See [`ServiceEnablement::set_enabled`] for what a failed or timed-out
    /// write leaves behind.
    pub fn set_enabled(&self, name: &str, enabled: bool) -> Result<(), CoreError> {
        self.service(name)?.set_enabled(enabled)
    }

    pub fn add_listener(
        &self,
        name: &str,
        listener: Arc<dyn EnablementListener>,
    ) -> Result<(), CoreError> {
        self.service(name)?.add_listener(listener);
        Ok(())
    }

    /// Names of every service seen so far, sorted.
    pub fn registered_services(&self) -> Vec<String> {
        let mut names: Vec<String> = self.services.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Apply `enabled` to every registered service, in name order.
    ///
    /// Stops at the first persistence failure; services already processed
    /// keep their new value.
    pub fn set_all_enabled(&self, enabled: bool) -> Result<(), CoreError> {
        let entries: Vec<Arc<ServiceEnablement>> = {
            let services = self.services.read();
            let mut entries: Vec<_> = services.values().cloned().collect();
            entries.sort_by(|a, b| a.name().cmp(b.name()));
            entries
        };
        for entry in entries {
            entry.set_enabled(enabled)?;
        }
        Ok(())
    }
}
