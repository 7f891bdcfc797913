//! Write deadline wrapper for stores that may block indefinitely.
//!
//! Writes are queued to one long-lived writer thread while the caller waits
//! at most the configured timeout. A write that misses the deadline is
//! reported as [`StorageError::Timeout`] but stays queued, so it may still
//! land later; writes land in the order they were issued. When the queue is
//! full the write is rejected as a timeout without being queued.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::{io_other, StorageError};
use crate::store::KeyValueStore;

/// Writes that may wait behind a stalled one before new writes are refused.
pub const WRITE_QUEUE_DEPTH: usize = 16;

enum WriteOp {
    Bool { key: String, value: bool },
    Text { key: String, value: String },
}

struct WriteJob {
    op: WriteOp,
    reply: mpsc::Sender<Result<(), StorageError>>,
}

pub struct DeadlineStore {
    inner: Arc<dyn KeyValueStore>,
    timeout: Duration,
    queue: Mutex<mpsc::SyncSender<WriteJob>>,
}

impl DeadlineStore {
    /// Wrap `inner`, starting its writer thread. The thread exits once the
    /// store is dropped and the queue has drained.
    pub fn new(inner: Arc<dyn KeyValueStore>, timeout: Duration) -> Result<Self, StorageError> {
        let (tx, rx) = mpsc::sync_channel::<WriteJob>(WRITE_QUEUE_DEPTH);
        let writer = Arc::clone(&inner);
        thread::Builder::new()
            .name("appsight-store-writer".to_string())
            .spawn(move || {
                for job in rx {
                    let result = match &job.op {
                        WriteOp::Bool { key, value } => writer.set_bool(key, *value),
                        WriteOp::Text { key, value } => writer.set_string(key, value),
                    };
                    let _ = job.reply.send(result);
                }
                debug!("store writer stopped");
            })
            .map_err(|e| io_other("Failed to spawn store writer", e))?;

        Ok(Self {
            inner,
            timeout,
            queue: Mutex::new(tx),
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn write_with_deadline(&self, op: WriteOp) -> Result<(), StorageError> {
        let key = match &op {
            WriteOp::Bool { key, .. } | WriteOp::Text { key, .. } => key.clone(),
        };
        let timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);
        let (reply, result) = mpsc::channel();

        match self.queue.lock().try_send(WriteJob { op, reply }) {
            Ok(()) => {}
            Err(mpsc::TrySendError::Full(_)) => {
                warn!(key = %key, timeout_ms, "store write queue is full");
                return Err(StorageError::Timeout(self.timeout));
            }
            Err(mpsc::TrySendError::Disconnected(_)) => {
                return Err(io_other("Store writer exited", "queue closed"));
            }
        }

        match result.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                warn!(key = %key, timeout_ms, "store write timed out");
                Err(StorageError::Timeout(self.timeout))
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                Err(io_other("Store writer exited", "no result"))
            }
        }
    }
}

impl KeyValueStore for DeadlineStore {
    fn get_bool(&self, key: &str) -> Result<Option<bool>, StorageError> {
        self.inner.get_bool(key)
    }

    fn set_bool(&self, key: &str, value: bool) -> Result<(), StorageError> {
        self.write_with_deadline(WriteOp::Bool {
            key: key.to_string(),
            value,
        })
    }

    fn get_string(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get_string(key)
    }

    fn set_string(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.write_with_deadline(WriteOp::Text {
            key: key.to_string(),
            value: value.to_string(),
        })
    }
}
