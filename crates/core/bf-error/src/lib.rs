//! Error types and classification for backfetch.
//!
//! This crate provides:
//! - [`BfError`] - Top-level error enum for run-level failures
//! - [`TransferError`] - Per-object download failures, recorded as outcomes
//! - [`BfError::exit_code`] - Mapping from run-level failure to process exit status

use thiserror::Error;

/// Exit status for a run where every object was downloaded or skipped.
pub const EXIT_OK: i32 = 0;
/// Exit status for unexpected internal errors.
pub const EXIT_INTERNAL: i32 = 1;
/// Exit status for invalid configuration.
pub const EXIT_CONFIG: i32 = 2;
/// Exit status when the bucket listing could not be performed.
pub const EXIT_STORAGE_UNAVAILABLE: i32 = 3;
/// Exit status when the pipeline completed but at least one object failed.
pub const EXIT_PARTIAL_FAILURE: i32 = 4;
/// Exit status when a match was required but nothing was selected.
pub const EXIT_NO_MATCH: i32 = 5;
/// Exit status when the run was interrupted by a signal.
pub const EXIT_CANCELLED: i32 = 130;

/// Top-level error type for backfetch.
///
/// Only errors that end a run surface as `BfError`. Per-object failures are
/// captured as [`TransferError`] inside a failed outcome and never abort the run.
#[derive(Error, Debug)]
pub enum BfError {
    /// The object listing could not be established or continued
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A single object transfer failed
    #[error("Transfer failed: {0}")]
    TransferFailed(#[from] TransferError),

    /// Configuration is malformed or refers to an unusable destination
    #[error("Configuration invalid: {0}")]
    ConfigurationInvalid(String),

    /// Generic errors (wrapped anyhow)
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BfError {
    /// Process exit status for a run that ended with this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::StorageUnavailable(_) => EXIT_STORAGE_UNAVAILABLE,
            Self::ConfigurationInvalid(_) => EXIT_CONFIG,
            Self::TransferFailed(_) => EXIT_PARTIAL_FAILURE,
            Self::Other(_) => EXIT_INTERNAL,
        }
    }

    /// Shorthand for building a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigurationInvalid(msg.into())
    }
}

/// Failure while materializing one object on local disk.
#[derive(Error, Debug)]
pub enum TransferError {
    /// The object store returned an error while opening or streaming the body
    #[error("network error: {0}")]
    Network(String),

    /// The number of bytes received differs from the listed object size
    #[error("size mismatch: expected {expected} bytes, received {actual}")]
    SizeMismatch { expected: u64, actual: u64 },

    /// Local filesystem error (permissions, disk full, rename failure)
    #[error("local I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A temporary file was created but never completed
    #[error("partial write of {written} bytes: {source}")]
    PartialWrite {
        written: u64,
        #[source]
        source: Box<TransferError>,
    },

    /// The transfer exceeded the configured per-object timeout
    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The run was cancelled while the transfer was in flight
    #[error("cancelled")]
    Cancelled,

    /// Another key in the same run already claimed the local path
    #[error("local path collision with {0}")]
    Collision(String),
}

impl TransferError {
    /// Wrap this error as a partial write when bytes already reached disk.
    pub fn after_write(self, written: u64) -> Self {
        if written == 0 || matches!(self, Self::PartialWrite { .. }) {
            return self;
        }
        Self::PartialWrite {
            written,
            source: Box::new(self),
        }
    }

    /// Whether this failure left a temporary artifact behind that needed cleanup.
    pub fn is_partial_write(&self) -> bool {
        matches!(self, Self::PartialWrite { .. })
    }
}

/// Result type alias using BfError.
pub type Result<T> = std::result::Result<T, BfError>;
