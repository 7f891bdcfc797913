//! Service enablement: per-service persisted on/off state with synchronous
//! change notification.

pub mod ledger;
pub mod service;

pub use ledger::EnablementLedger;
pub use service::{ServiceEnablement, IS_ENABLED_KEY};

/// Notified synchronously, before `set_enabled` returns, whenever a
/// service's enablement actually changes.
pub trait EnablementListener: Send + Sync {
    fn on_enablement_changed(&self, service: &str, enabled: bool);
}
