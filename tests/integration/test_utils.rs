//! Shared test utilities for integration tests
//!
//! Stores with injectable failures and delays, and a recording listener, so tests can
//! observe exactly what the core persisted and announced.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use appsight::enablement::EnablementListener;
use appsight::store::{KeyValueStore, MemoryKeyValueStore};
use appsight::StorageError;
use parking_lot::Mutex;

/// In-memory store whose writes can be switched to fail.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryKeyValueStore,
    fail_writes: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::IoError(std::io::Error::new(
                std::io::ErrorKind::Other,
                "injected write failure",
            )));
        }
        Ok(())
    }
}

impl KeyValueStore for FlakyStore {
    fn get_bool(&self, key: &str) -> Result<Option<bool>, StorageError> {
        self.inner.get_bool(key)
    }

    fn set_bool(&self, key: &str, value: bool) -> Result<(), StorageError> {
        self.check()?;
        self.inner.set_bool(key, value)
    }

    fn get_string(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get_string(key)
    }

    fn set_string(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check()?;
        self.inner.set_string(key, value)
    }
}

/// Records every enablement change it is told about.
#[derive(Default)]
pub struct RecordingListener {
    pub changes: Mutex<Vec<(String, bool)>>,
}

impl EnablementListener for RecordingListener {
    fn on_enablement_changed(&self, service: &str, enabled: bool) {
        self.changes.lock().push((service.to_string(), enabled));
    }
}

/// In-memory store whose writes each take `delay`.
pub struct SlowStore {
    inner: MemoryKeyValueStore,
    delay: Duration,
}

impl SlowStore {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryKeyValueStore::new(),
            delay,
        })
    }
}

impl KeyValueStore for SlowStore {
    fn get_bool(&self, key: &str) -> Result<Option<bool>, StorageError> {
        self.inner.get_bool(key)
    }

    fn set_bool(&self, key: &str, value: bool) -> Result<(), StorageError> {
        thread::sleep(self.delay);
        self.inner.set_bool(key, value)
    }

    fn get_string(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get_string(key)
    }

    fn set_string(&self, key: &str, value: &str) -> Result<(), StorageError> {
        thread::sleep(self.delay);
        self.inner.set_string(key, value)
    }
}

/// In-memory store whose reads of keys containing `gated` block until the
/// test releases them.
pub struct GatedStore {
    inner: MemoryKeyValueStore,
    gated: String,
    entered: Mutex<mpsc::Sender<()>>,
    release: Mutex<mpsc::Receiver<()>>,
}

impl GatedStore {
    /// Returns the store, a receiver signalled when a gated read starts and a
    /// sender that lets it finish.
    pub fn new(gated: &str) -> (Arc<Self>, mpsc::Receiver<()>, mpsc::Sender<()>) {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let store = Arc::new(Self {
            inner: MemoryKeyValueStore::new(),
            gated: gated.to_string(),
            entered: Mutex::new(entered_tx),
            release: Mutex::new(release_rx),
        });
        (store, entered_rx, release_tx)
    }
}

impl KeyValueStore for GatedStore {
    fn get_bool(&self, key: &str) -> Result<Option<bool>, StorageError> {
        if key.contains(&self.gated) {
            let _ = self.entered.lock().send(());
            let _ = self.release.lock().recv_timeout(Duration::from_secs(10));
        }
        self.inner.get_bool(key)
    }

    fn set_bool(&self, key: &str, value: bool) -> Result<(), StorageError> {
        self.inner.set_bool(key, value)
    }

    fn get_string(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get_string(key)
    }

    fn set_string(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.inner.set_string(key, value)
    }
}
