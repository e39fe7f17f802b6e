//! Per-object download outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Final state of one object after the download executor ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    /// Content was transferred and renamed into place
    Downloaded,

    /// An identical artifact already existed locally
    Skipped,

    /// The transfer failed; see the outcome reason
    Failed,
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Downloaded => write!(f, "downloaded"),
            Self::Skipped => write!(f, "skipped"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Result of attempting to materialize one remote object locally.
///
/// Created by the download executor and never mutated afterwards.
/// `reason` is present iff the status is `Skipped` or `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadOutcome {
    /// When the outcome was produced
    pub timestamp: DateTime<Utc>,

    /// Remote object key
    pub key: String,

    /// Final local path for the object
    pub local_path: PathBuf,

    /// What happened
    pub status: OutcomeStatus,

    /// Why the object was skipped or failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Bytes written to the final path (zero unless downloaded)
    pub bytes_transferred: u64,
}

impl DownloadOutcome {
    /// The object was transferred in full.
    pub fn downloaded(key: impl Into<String>, local_path: impl Into<PathBuf>, bytes: u64) -> Self {
        Self {
            timestamp: Utc::now(),
            key: key.into(),
            local_path: local_path.into(),
            status: OutcomeStatus::Downloaded,
            reason: None,
            bytes_transferred: bytes,
        }
    }

    /// The object needed no transfer.
    pub fn skipped(
        key: impl Into<String>,
        local_path: impl Into<PathBuf>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            key: key.into(),
            local_path: local_path.into(),
            status: OutcomeStatus::Skipped,
            reason: Some(reason.into()),
            bytes_transferred: 0,
        }
    }

    /// The object could not be materialized.
    pub fn failed(
        key: impl Into<String>,
        local_path: impl Into<PathBuf>,
        reason: impl ToString,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            key: key.into(),
            local_path: local_path.into(),
            status: OutcomeStatus::Failed,
            reason: Some(reason.to_string()),
            bytes_transferred: 0,
        }
    }

    /// Whether this outcome counts as a failure.
    pub fn is_failure(&self) -> bool {
        self.status == OutcomeStatus::Failed
    }
}
