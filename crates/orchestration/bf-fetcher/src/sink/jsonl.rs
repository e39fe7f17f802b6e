//! Append-only JSON Lines report.

use async_trait::async_trait;
use bf_error::{BfError, Result};
use bf_traits::OutcomeSink;
use bf_types::{DownloadOutcome, RunSummary};
use serde::Serialize;
use std::path::PathBuf;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Writes one JSON object per outcome, then a final `{"summary": ...}` line.
///
/// Each line is flushed as soon as it is written, so a report from an
/// interrupted run is still readable up to the last outcome.
pub struct JsonlSink {
    path: PathBuf,
    file: Mutex<File>,
}

#[derive(Serialize)]
struct SummaryLine<'a> {
    summary: &'a RunSummary,
}

impl JsonlSink {
    /// Open `path` for appending, creating it if needed.
    pub async fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| {
                BfError::config(format!("cannot open report file {}: {e}", path.display()))
            })?;

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    async fn append<T: Serialize>(&self, value: &T) -> Result<()> {
        let mut line = serde_json::to_vec(value)
            .map_err(|e| BfError::Other(anyhow::anyhow!("JSON serialization failed: {e}")))?;
        line.push(b'\n');

        let mut file = self.file.lock().await;
        let write = async {
            file.write_all(&line).await?;
            file.flush().await
        };
        write.await.map_err(|e| {
            BfError::Other(anyhow::anyhow!(
                "failed to write report {}: {e}",
                self.path.display()
            ))
        })
    }
}

#[async_trait]
impl OutcomeSink for JsonlSink {
    async fn record(&self, outcome: &DownloadOutcome) -> Result<()> {
        self.append(outcome).await
    }

    async fn finish(&self, summary: &RunSummary) -> Result<()> {
        self.append(&SummaryLine { summary }).await
    }
}
