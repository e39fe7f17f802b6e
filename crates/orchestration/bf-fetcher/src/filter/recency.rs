//! Recency window filtering.

use bf_error::{BfError, Result};
use bf_types::ObjectDescriptor;
use chrono::{DateTime, Duration, Utc};

use super::Filter;

/// Upper bound for a recency window (ten years).
pub const MAX_WINDOW_SECS: i64 = 10 * 365 * 24 * 60 * 60;

/// A filter that keeps objects modified within a look-back window.
///
/// The window is measured from a reference time captured once, normally the
/// run start, so every object is judged against the same instant. The
/// boundary is inclusive: an object exactly `window` old is selected.
/// Objects without a modification time are never selected, and objects
/// stamped after the reference (clock skew) count as brand new.
///
/// # Example
///
/// ```
/// use chrono::{Duration, Utc};
/// use bf_fetcher::RecencyFilter;
///
/// let now = Utc::now();
/// let filter = RecencyFilter::new(Duration::hours(24), now);
///
/// assert!(filter.matches_time(Some(now - Duration::hours(24))));
/// assert!(!filter.matches_time(Some(now - Duration::hours(24) - Duration::seconds(1))));
/// ```
#[derive(Debug, Clone)]
pub struct RecencyFilter {
    window: Duration,
    reference: DateTime<Utc>,
}

impl RecencyFilter {
    /// Create a filter for `window` before `reference`.
    pub fn new(window: Duration, reference: DateTime<Utc>) -> Self {
        Self { window, reference }
    }

    /// Check whether a modification time falls inside the window.
    pub fn matches_time(&self, last_modified: Option<DateTime<Utc>>) -> bool {
        let Some(modified) = last_modified else {
            return false;
        };
        self.reference - modified <= self.window
    }

    /// Oldest modification time that is still selected.
    pub fn cutoff(&self) -> DateTime<Utc> {
        self.reference - self.window
    }

    /// The look-back window.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// The instant the window is measured from.
    pub fn reference(&self) -> DateTime<Utc> {
        self.reference
    }
}

impl Filter for RecencyFilter {
    fn matches(&self, obj: &ObjectDescriptor) -> bool {
        self.matches_time(obj.last_modified)
    }

    fn description(&self) -> String {
        format!(
            "modified_since({})",
            self.cutoff().format("%Y-%m-%d %H:%M:%S")
        )
    }
}

/// Parse a window such as `24h`, `30m`, `7d`, `2w`, or a bare number of seconds.
///
/// Zero, negative, and windows longer than ten years are rejected.
pub fn parse_window(input: &str) -> Result<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(BfError::config("Empty recency window"));
    }

    let (num_str, unit_secs) = match input.chars().last() {
        Some('s' | 'S') => (&input[..input.len() - 1], 1),
        Some('m' | 'M') => (&input[..input.len() - 1], 60),
        Some('h' | 'H') => (&input[..input.len() - 1], 60 * 60),
        Some('d' | 'D') => (&input[..input.len() - 1], 24 * 60 * 60),
        Some('w' | 'W') => (&input[..input.len() - 1], 7 * 24 * 60 * 60),
        Some(c) if c.is_ascii_digit() => (input, 1),
        _ => {
            return Err(BfError::config(format!(
                "Invalid window unit in '{input}'. Use s, m, h, d or w (e.g. 24h, 7d)"
            )));
        }
    };

    let num: i64 = num_str
        .trim()
        .parse()
        .map_err(|_| BfError::config(format!("Invalid number in window '{input}'")))?;

    if num <= 0 {
        return Err(BfError::config(format!(
            "Window must be greater than zero, got '{input}'"
        )));
    }

    let secs = num
        .checked_mul(unit_secs)
        .filter(|secs| *secs <= MAX_WINDOW_SECS)
        .ok_or_else(|| BfError::config(format!("Window '{input}' exceeds ten years")))?;

    Ok(Duration::seconds(secs))
}
