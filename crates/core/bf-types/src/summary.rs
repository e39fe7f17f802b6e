//! Aggregate statistics for one fetch run.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::outcome::{DownloadOutcome, OutcomeStatus};

/// A failed object and the reason it failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedObject {
    pub key: String,
    pub reason: String,
}

/// Summary of all outcomes for one invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    /// When the run started
    pub started_at: Option<DateTime<Utc>>,

    /// When the run completed
    pub completed_at: Option<DateTime<Utc>>,

    /// Number of objects produced by listing (before filtering)
    pub objects_listed: usize,

    /// Number of objects that passed selection
    pub objects_selected: usize,

    /// Objects transferred in full
    pub downloaded: usize,

    /// Objects already present locally
    pub skipped: usize,

    /// Objects that failed
    pub failed: usize,

    /// Total bytes written to final paths
    pub bytes_transferred: u64,

    /// Whether the run stopped early because of a shutdown signal
    pub cancelled: bool,

    /// Key and reason for each failed object
    pub failures: Vec<FailedObject>,
}

impl RunSummary {
    /// Create a new summary with the current time as start time.
    pub fn new() -> Self {
        Self::started(Utc::now())
    }

    /// Create a new summary with an explicit start time.
    pub fn started(at: DateTime<Utc>) -> Self {
        Self {
            started_at: Some(at),
            ..Default::default()
        }
    }

    /// Fold one outcome into the counts.
    pub fn record(&mut self, outcome: &DownloadOutcome) {
        match outcome.status {
            OutcomeStatus::Downloaded => self.downloaded += 1,
            OutcomeStatus::Skipped => self.skipped += 1,
            OutcomeStatus::Failed => {
                self.failed += 1;
                self.failures.push(FailedObject {
                    key: outcome.key.clone(),
                    reason: outcome.reason.clone().unwrap_or_default(),
                });
            }
        }
        self.bytes_transferred += outcome.bytes_transferred;
    }

    /// Mark the run as complete with the current time.
    pub fn complete(&mut self) {
        self.completed_at = Some(Utc::now());
    }

    /// Total number of outcomes recorded.
    pub fn processed(&self) -> usize {
        self.downloaded + self.skipped + self.failed
    }

    /// Check if any object failed.
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// A run is successful when no object failed.
    pub fn is_success(&self) -> bool {
        !self.has_failures()
    }

    /// Get the duration of the run.
    pub fn duration(&self) -> Option<Duration> {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }
}
