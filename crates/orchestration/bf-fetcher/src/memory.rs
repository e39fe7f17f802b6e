//! In-memory object store for tests and local development.

use async_trait::async_trait;
use bf_error::{BfError, TransferError};
use bf_traits::{ByteStream, ObjectStore, ObjectStream};
use bf_types::ObjectDescriptor;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::{StreamExt, stream};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};

/// Chunk size used when streaming object content.
const CHUNK_SIZE: usize = 4;

/// A failure to inject when an object is fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// `GetObject` itself fails before any byte is delivered
    Unavailable,

    /// The body stream errors after delivering this many bytes
    FailAfter(usize),

    /// The body ends cleanly after this many bytes (short read)
    Truncate(usize),

    /// The body delivers this many bytes and then never yields again
    Stall(usize),
}

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    last_modified: DateTime<Utc>,
}

/// An [`ObjectStore`] that keeps objects in a sorted map.
///
/// Listing returns keys in lexicographic order, like S3. Faults can be
/// injected per key, and listing can be made to fail before or partway
/// through the listed keys.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<String, StoredObject>>,
    faults: Mutex<HashMap<String, Fault>>,
    listing_failure: Mutex<Option<(usize, String)>>,
    fetches: Mutex<HashMap<String, usize>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an object.
    pub fn insert(&self, key: impl Into<String>, data: impl Into<Bytes>, last_modified: DateTime<Utc>) {
        self.objects.lock().insert(
            key.into(),
            StoredObject {
                data: data.into(),
                last_modified,
            },
        );
    }

    /// Make fetches of `key` fail.
    pub fn inject_fault(&self, key: impl Into<String>, fault: Fault) {
        self.faults.lock().insert(key.into(), fault);
    }

    /// Clear an injected fault.
    pub fn clear_fault(&self, key: &str) {
        self.faults.lock().remove(key);
    }

    /// Make every listing call fail with `reason`.
    pub fn fail_listing(&self, reason: impl Into<String>) {
        self.fail_listing_after(0, reason);
    }

    /// Make listing calls yield `count` objects and then fail with `reason`.
    pub fn fail_listing_after(&self, count: usize, reason: impl Into<String>) {
        *self.listing_failure.lock() = Some((count, reason.into()));
    }

    /// Number of times `key` was fetched.
    pub fn fetch_count(&self, key: &str) -> usize {
        self.fetches.lock().get(key).copied().unwrap_or(0)
    }

    /// Total number of fetches across all keys.
    pub fn total_fetches(&self) -> usize {
        self.fetches.lock().values().sum()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    fn list<'a>(&'a self, prefix: Option<&'a str>) -> ObjectStream<'a> {
        let prefix = prefix.unwrap_or_default();
        let mut snapshot: Vec<_> = self
            .objects
            .lock()
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, obj)| {
                Ok(ObjectDescriptor {
                    key: key.clone(),
                    size: obj.data.len() as u64,
                    last_modified: Some(obj.last_modified),
                })
            })
            .collect();

        if let Some((count, reason)) = self.listing_failure.lock().clone() {
            snapshot.truncate(count);
            snapshot.push(Err(BfError::StorageUnavailable(reason)));
        }

        Box::pin(stream::iter(snapshot))
    }

    async fn fetch(&self, key: &str) -> Result<ByteStream, TransferError> {
        *self.fetches.lock().entry(key.to_string()).or_default() += 1;

        let data = self
            .objects
            .lock()
            .get(key)
            .map(|obj| obj.data.clone())
            .ok_or_else(|| TransferError::Network(format!("NoSuchKey: {key}")))?;

        let fault = self.faults.lock().get(key).cloned();
        let (limit, trailing_error, stall) = match fault {
            Some(Fault::Unavailable) => {
                return Err(TransferError::Network(format!(
                    "injected failure opening {key}"
                )));
            }
            Some(Fault::FailAfter(n)) => (n.min(data.len()), true, false),
            Some(Fault::Truncate(n)) => (n.min(data.len()), false, false),
            Some(Fault::Stall(n)) => (n.min(data.len()), false, true),
            None => (data.len(), false, false),
        };

        let mut chunks: Vec<Result<Bytes, TransferError>> = data
            .slice(..limit)
            .chunks(CHUNK_SIZE)
            .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
            .collect();
        if trailing_error {
            chunks.push(Err(TransferError::Network(format!(
                "injected failure after {limit} bytes of {key}"
            ))));
        }

        if stall {
            return Ok(Box::pin(stream::iter(chunks).chain(stream::pending())));
        }
        Ok(Box::pin(stream::iter(chunks)))
    }

    fn location(&self) -> String {
        "memory://".to_string()
    }
}
