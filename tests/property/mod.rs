//! Property-based tests for session attribution guarantees

mod session_tracker;
