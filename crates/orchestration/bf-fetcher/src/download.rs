//! Download executor.
//!
//! Materializes one selected object under the destination directory. Content
//! is streamed into a hidden `.part` file next to the target, synced, checked
//! against the listed size and renamed into place. The final path therefore
//! holds either a complete object or whatever was there before.

use bf_error::TransferError;
use bf_traits::ObjectStore;
use bf_types::{DownloadOutcome, ObjectDescriptor};
use futures::StreamExt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

/// Reason recorded when an identical file is already at the target path.
pub const ALREADY_PRESENT: &str = "already present";

/// Downloads selected objects into a flat destination directory.
#[derive(Debug, Clone)]
pub struct Downloader {
    destination: PathBuf,
    transfer_timeout: Option<Duration>,
    cancel: CancellationToken,
}

impl Downloader {
    /// Create a downloader writing into `destination`.
    pub fn new(
        destination: impl Into<PathBuf>,
        transfer_timeout: Option<Duration>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            destination: destination.into(),
            transfer_timeout,
            cancel,
        }
    }

    /// The final local path for `obj`.
    pub fn target_path(&self, obj: &ObjectDescriptor) -> PathBuf {
        self.destination.join(obj.basename())
    }

    /// Download one object and report what happened.
    ///
    /// Never returns an error: every failure becomes a `Failed` outcome.
    pub async fn download<S>(&self, store: &S, obj: &ObjectDescriptor) -> DownloadOutcome
    where
        S: ObjectStore + ?Sized,
    {
        let target = self.target_path(obj);

        if existing_size(&target).await == Some(obj.size) {
            debug!(key = %obj.key, path = %target.display(), "Local copy is current");
            return DownloadOutcome::skipped(&obj.key, target, ALREADY_PRESENT);
        }

        if self.cancel.is_cancelled() {
            return DownloadOutcome::failed(&obj.key, target, TransferError::Cancelled);
        }

        // Outlives the transfer future, which is dropped on cancel or timeout
        let written = AtomicU64::new(0);
        let transfer = with_timeout(
            self.transfer_timeout,
            self.transfer(store, obj, &target, &written),
        );
        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(TransferError::Cancelled),
            result = transfer => result,
        };

        match result.map_err(|e| e.after_write(written.load(Ordering::Relaxed))) {
            Ok(bytes) => {
                debug!(key = %obj.key, path = %target.display(), bytes, "Downloaded object");
                DownloadOutcome::downloaded(&obj.key, target, bytes)
            }
            Err(e) => {
                warn!(key = %obj.key, error = %e, "Transfer failed");
                if e.is_partial_write() {
                    debug!(key = %obj.key, "Discarded partial file");
                }
                DownloadOutcome::failed(&obj.key, target, e)
            }
        }
    }

    async fn transfer<S>(
        &self,
        store: &S,
        obj: &ObjectDescriptor,
        target: &Path,
        written: &AtomicU64,
    ) -> Result<u64, TransferError>
    where
        S: ObjectStore + ?Sized,
    {
        let mut body = store.fetch(&obj.key).await?;
        let mut part = PartFile::create(&self.destination, obj.basename()).await?;

        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| e.after_write(part.written))?;
            part.write(&chunk)
                .await
                .map_err(|e| TransferError::from(e).after_write(part.written))?;
            written.store(part.written, Ordering::Relaxed);
        }

        if part.written != obj.size {
            return Err(TransferError::SizeMismatch {
                expected: obj.size,
                actual: part.written,
            }
            .after_write(part.written));
        }

        part.commit(target).await
    }
}

async fn with_timeout<F>(limit: Option<Duration>, transfer: F) -> Result<u64, TransferError>
where
    F: Future<Output = Result<u64, TransferError>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, transfer)
            .await
            .unwrap_or(Err(TransferError::Timeout(limit))),
        None => transfer.await,
    }
}

async fn existing_size(path: &Path) -> Option<u64> {
    fs::metadata(path)
        .await
        .ok()
        .filter(|meta| meta.is_file())
        .map(|meta| meta.len())
}

/// Temporary file that is removed on drop unless committed.
struct PartFile {
    path: PathBuf,
    file: File,
    written: u64,
    committed: bool,
}

impl PartFile {
    async fn create(dir: &Path, basename: &str) -> std::io::Result<Self> {
        let path = dir.join(format!(".{basename}.{}.part", Uuid::new_v4()));
        let file = File::create(&path).await?;
        Ok(Self {
            path,
            file,
            written: 0,
            committed: false,
        })
    }

    async fn write(&mut self, chunk: &[u8]) -> std::io::Result<()> {
        self.file.write_all(chunk).await?;
        self.written += chunk.len() as u64;
        Ok(())
    }

    async fn commit(mut self, target: &Path) -> Result<u64, TransferError> {
        let written = self.written;
        let sync = async {
            self.file.flush().await?;
            self.file.sync_all().await?;
            fs::rename(&self.path, target).await
        };
        sync.await
            .map_err(|e| TransferError::from(e).after_write(written))?;
        self.committed = true;
        Ok(written)
    }
}

impl Drop for PartFile {
    fn drop(&mut self) {
        if !self.committed {
            // Runs on cancellation too, so it cannot be async
            if let Err(e) = std::fs::remove_file(&self.path) {
                debug!(path = %self.path.display(), error = %e, "Could not remove partial file");
            }
        }
    }
}
