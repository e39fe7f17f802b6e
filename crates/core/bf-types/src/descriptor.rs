//! Remote object descriptors produced by listing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata about a remote object, sufficient to decide selection
/// without fetching its content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectDescriptor {
    /// The object key (full path within the bucket)
    pub key: String,

    /// Size of the object in bytes
    pub size: u64,

    /// Last modified timestamp, if the store reported one
    pub last_modified: Option<DateTime<Utc>>,
}

impl ObjectDescriptor {
    /// Create a descriptor with a known modification time.
    pub fn new(key: impl Into<String>, size: u64, last_modified: DateTime<Utc>) -> Self {
        Self {
            key: key.into(),
            size,
            last_modified: Some(last_modified),
        }
    }

    /// The last path segment of the key (content after the final `/`).
    ///
    /// Folder placeholders have an empty basename.
    pub fn basename(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }

    /// Whether this key is a virtual folder marker rather than real content.
    pub fn is_folder_placeholder(&self) -> bool {
        self.key.ends_with('/')
    }
}
