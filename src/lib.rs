//! Appsight: session attribution and service enablement core
//!
//! The part of a client-side telemetry SDK that decides which session an
//! event belongs to, from its timestamp alone, and whether each instrumented
//! service may produce telemetry at all. Transport, batching and app
//! lifecycle detection live outside this crate and call into it.

pub mod config;
pub mod enablement;
pub mod error;
pub mod facade;
pub mod logging;
pub mod session;
pub mod store;

pub use error::{CoreError, StorageError};
pub use facade::{TelemetryCore, SESSIONS_SERVICE};
