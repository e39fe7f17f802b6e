//! Shared utilities for backfetch CLI binaries.

pub mod args;
pub mod format;
pub mod logging;

pub use args::LogLevel;
pub use format::{format_bytes, format_duration_ms};
pub use logging::init_logging;
