//! Sink that reports outcomes through `tracing`.

use async_trait::async_trait;
use bf_error::Result;
use bf_traits::OutcomeSink;
use bf_types::{DownloadOutcome, OutcomeStatus, RunSummary};
use tracing::{error, info, warn};

/// Emits one structured event per outcome and one for the summary.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl LogSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl OutcomeSink for LogSink {
    async fn record(&self, outcome: &DownloadOutcome) -> Result<()> {
        let reason = outcome.reason.as_deref().unwrap_or_default();
        match outcome.status {
            OutcomeStatus::Downloaded | OutcomeStatus::Skipped => info!(
                key = %outcome.key,
                status = %outcome.status,
                reason,
                bytes = outcome.bytes_transferred,
                local_path = %outcome.local_path.display(),
                "Object processed"
            ),
            OutcomeStatus::Failed => warn!(
                key = %outcome.key,
                status = %outcome.status,
                reason,
                local_path = %outcome.local_path.display(),
                "Object failed"
            ),
        }
        Ok(())
    }

    async fn finish(&self, summary: &RunSummary) -> Result<()> {
        let duration_ms = summary
            .duration()
            .map(|d| d.num_milliseconds())
            .unwrap_or_default();

        if summary.has_failures() {
            error!(
                listed = summary.objects_listed,
                selected = summary.objects_selected,
                downloaded = summary.downloaded,
                skipped = summary.skipped,
                failed = summary.failed,
                bytes = summary.bytes_transferred,
                cancelled = summary.cancelled,
                duration_ms,
                "Run finished with failures"
            );
        } else {
            info!(
                listed = summary.objects_listed,
                selected = summary.objects_selected,
                downloaded = summary.downloaded,
                skipped = summary.skipped,
                bytes = summary.bytes_transferred,
                cancelled = summary.cancelled,
                duration_ms,
                "Run finished"
            );
        }
        Ok(())
    }
}
