//! Configuration types for a fetch run.

use bf_error::{BfError, Result};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::info;

/// Default number of concurrent transfers.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Configuration for the download side of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Local directory that receives downloaded objects
    pub destination: PathBuf,

    /// Maximum number of transfers in flight
    pub concurrency: usize,

    /// Optional per-object transfer timeout
    pub transfer_timeout: Option<Duration>,

    /// Create the destination directory if it does not exist
    pub create_destination: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            destination: PathBuf::from("./downloads"),
            concurrency: DEFAULT_CONCURRENCY,
            transfer_timeout: None,
            create_destination: true,
        }
    }
}

impl FetchConfig {
    /// Create a new fetch configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the destination directory.
    pub fn with_destination(mut self, destination: impl Into<PathBuf>) -> Self {
        self.destination = destination.into();
        self
    }

    /// Set the maximum number of concurrent transfers.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the per-object transfer timeout.
    pub fn with_transfer_timeout(mut self, timeout: Duration) -> Self {
        self.transfer_timeout = Some(timeout);
        self
    }

    /// Set whether a missing destination is created.
    pub fn with_create_destination(mut self, create: bool) -> Self {
        self.create_destination = create;
        self
    }

    /// Validate configuration values that do not touch the filesystem.
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(BfError::config("concurrency must be at least 1"));
        }
        if self.transfer_timeout == Some(Duration::ZERO) {
            return Err(BfError::config("transfer timeout must be greater than zero"));
        }
        if self.destination.as_os_str().is_empty() {
            return Err(BfError::config("destination directory must not be empty"));
        }
        Ok(())
    }

    /// Ensure the destination exists and is a directory.
    pub async fn prepare_destination(&self) -> Result<()> {
        prepare_directory(&self.destination, self.create_destination).await
    }
}

async fn prepare_directory(path: &Path, create: bool) -> Result<()> {
    match fs::metadata(path).await {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(BfError::config(format!(
            "destination {} exists but is not a directory",
            path.display()
        ))),
        Err(e) if e.kind() == ErrorKind::NotFound && create => {
            fs::create_dir_all(path).await.map_err(|e| {
                BfError::config(format!(
                    "cannot create destination {}: {e}",
                    path.display()
                ))
            })?;
            info!(destination = %path.display(), "Created destination directory");
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Err(BfError::config(format!(
            "destination {} does not exist",
            path.display()
        ))),
        Err(e) => Err(BfError::config(format!(
            "cannot access destination {}: {e}",
            path.display()
        ))),
    }
}
