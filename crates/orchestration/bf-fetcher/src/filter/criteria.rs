//! Combined selection criteria for one run.

use bf_error::{BfError, Result};
use bf_types::ObjectDescriptor;
use chrono::{DateTime, Duration, Utc};

use super::{Filter, MAX_WINDOW_SECS, PatternFilter, RecencyFilter};

/// The immutable selection rule for a run.
///
/// An object is selected iff it is not a folder placeholder, its
/// modification time is within the recency window, and its basename matches
/// the pattern. The reference time is captured when the criteria are built
/// and never re-evaluated.
#[derive(Debug, Clone)]
pub struct SelectionCriteria {
    recency: RecencyFilter,
    pattern: PatternFilter,
}

impl SelectionCriteria {
    /// Build criteria measured from the current instant.
    pub fn new(window: Duration, pattern: PatternFilter) -> Result<Self> {
        Self::with_reference(window, pattern, Utc::now())
    }

    /// Build criteria measured from an explicit reference time.
    pub fn with_reference(
        window: Duration,
        pattern: PatternFilter,
        reference: DateTime<Utc>,
    ) -> Result<Self> {
        if window <= Duration::zero() {
            return Err(BfError::config("recency window must be greater than zero"));
        }
        if window.num_seconds() > MAX_WINDOW_SECS {
            return Err(BfError::config("recency window exceeds ten years"));
        }

        Ok(Self {
            recency: RecencyFilter::new(window, reference),
            pattern,
        })
    }

    /// The look-back window.
    pub fn window(&self) -> Duration {
        self.recency.window()
    }

    /// The instant the window is measured from.
    pub fn reference(&self) -> DateTime<Utc> {
        self.recency.reference()
    }

    /// The filename pattern.
    pub fn pattern(&self) -> &PatternFilter {
        &self.pattern
    }
}

impl Filter for SelectionCriteria {
    fn matches(&self, obj: &ObjectDescriptor) -> bool {
        if obj.is_folder_placeholder() {
            return false;
        }
        // Cheap timestamp comparison first
        self.recency.matches(obj) && self.pattern.matches(obj)
    }

    fn description(&self) -> String {
        format!(
            "{} AND {}",
            self.recency.description(),
            self.pattern.description()
        )
    }
}
