//! Configuration sources, lowest precedence first.

pub mod app_file;
pub mod env;
pub mod global_file;
