//! Outcome sinks.
//!
//! This module provides [`OutcomeSink`] implementations:
//! - [`LogSink`] - One `tracing` event per outcome and per summary
//! - [`JsonlSink`] - Appends JSON lines to a report file
//! - [`FanoutSink`] - Forwards to several sinks

mod jsonl;
mod log;

pub use jsonl::JsonlSink;
pub use log::LogSink;

use async_trait::async_trait;
use bf_error::Result;
use bf_traits::OutcomeSink;
use bf_types::{DownloadOutcome, RunSummary};

/// Forwards every call to each inner sink in order.
///
/// Every sink sees every call. The first error is returned after all sinks
/// have been tried.
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Box<dyn OutcomeSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sink.
    pub fn with(mut self, sink: impl OutcomeSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

#[async_trait]
impl OutcomeSink for FanoutSink {
    async fn record(&self, outcome: &DownloadOutcome) -> Result<()> {
        let mut first_error = None;
        for sink in &self.sinks {
            if let Err(e) = sink.record(outcome).await {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    async fn finish(&self, summary: &RunSummary) -> Result<()> {
        let mut first_error = None;
        for sink in &self.sinks {
            if let Err(e) = sink.finish(summary).await {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
