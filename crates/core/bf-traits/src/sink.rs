//! Outcome sink trait.

use async_trait::async_trait;
use bf_error::Result;
use bf_types::{DownloadOutcome, RunSummary};
use std::sync::Arc;

/// Trait for recording download outcomes.
///
/// Implementations deliver one record per outcome and one final record
/// for the run summary, whether to the log, a report file, or elsewhere.
#[async_trait]
pub trait OutcomeSink: Send + Sync {
    /// Record a single outcome.
    async fn record(&self, outcome: &DownloadOutcome) -> Result<()>;

    /// Record the finalized run summary.
    ///
    /// Called exactly once, after the last outcome.
    async fn finish(&self, summary: &RunSummary) -> Result<()>;
}

#[async_trait]
impl<T: OutcomeSink + ?Sized> OutcomeSink for Arc<T> {
    async fn record(&self, outcome: &DownloadOutcome) -> Result<()> {
        (**self).record(outcome).await
    }

    async fn finish(&self, summary: &RunSummary) -> Result<()> {
        (**self).finish(summary).await
    }
}

#[async_trait]
impl<T: OutcomeSink + ?Sized> OutcomeSink for Box<T> {
    async fn record(&self, outcome: &DownloadOutcome) -> Result<()> {
        (**self).record(outcome).await
    }

    async fn finish(&self, summary: &RunSummary) -> Result<()> {
        (**self).finish(summary).await
    }
}
