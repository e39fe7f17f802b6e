//! Run reporter: folds outcomes into a [`RunSummary`].

use bf_types::{DownloadOutcome, RunSummary};
use chrono::{DateTime, Utc};
use tracing::info;

/// Log a progress line every this many outcomes.
const PROGRESS_INTERVAL: usize = 100;

/// Accumulates listing counts and outcomes for a single run.
#[derive(Debug)]
pub struct Reporter {
    summary: RunSummary,
}

impl Reporter {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            summary: RunSummary::started(started_at),
        }
    }

    /// Fold one outcome into the running counts.
    pub fn record(&mut self, outcome: &DownloadOutcome) {
        self.summary.record(outcome);

        let processed = self.summary.processed();
        if processed % PROGRESS_INTERVAL == 0 {
            info!(
                processed,
                downloaded = self.summary.downloaded,
                failed = self.summary.failed,
                "Progress"
            );
        }
    }

    /// Produce the final summary with the listing counts.
    pub fn finish(mut self, listed: usize, selected: usize, cancelled: bool) -> RunSummary {
        self.summary.objects_listed = listed;
        self.summary.objects_selected = selected;
        self.summary.cancelled = cancelled;
        self.summary.complete();
        self.summary
    }
}
