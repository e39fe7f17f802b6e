//! Selection filters for listed objects.
//!
//! An object is selected when it is recent enough and its base filename
//! matches the configured regular expression:
//! - [`RecencyFilter`] - Inclusive look-back window from a fixed reference time
//! - [`PatternFilter`] - Regex over the basename, case-sensitive by default
//! - [`SelectionCriteria`] - Both of the above, plus folder-placeholder rejection

mod criteria;
mod pattern;
mod recency;

pub use criteria::SelectionCriteria;
pub use pattern::PatternFilter;
pub use recency::{MAX_WINDOW_SECS, RecencyFilter, parse_window};

use bf_types::ObjectDescriptor;

/// A predicate over listed objects.
///
/// Filters are pure: they never touch the network or the filesystem.
pub trait Filter: Send + Sync {
    /// Check whether an object passes the filter.
    fn matches(&self, obj: &ObjectDescriptor) -> bool;

    /// Short description for logging.
    fn description(&self) -> String;
}
