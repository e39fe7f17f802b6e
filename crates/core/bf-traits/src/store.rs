//! Object store trait and stream aliases.

use async_trait::async_trait;
use bf_error::{Result, TransferError};
use bf_types::ObjectDescriptor;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;

/// A lazy stream of listed objects.
///
/// Items arrive page by page; an `Err` item means listing cannot continue.
pub type ObjectStream<'a> = Pin<Box<dyn Stream<Item = Result<ObjectDescriptor>> + Send + 'a>>;

/// A stream of content chunks for one object.
pub type ByteStream = Pin<Box<dyn Stream<Item = std::result::Result<Bytes, TransferError>> + Send>>;

/// Trait for object storage backends.
///
/// # Implementations
///
/// - S3 store: `ListObjectsV2` pagination and `GetObject` body streaming
/// - Memory store: in-process objects for tests and local development
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Lists every object whose key starts with `prefix`, recursively.
    ///
    /// Objects nested under virtual sub-folders are included. Each call
    /// queries the store again and may observe different contents.
    fn list<'a>(&'a self, prefix: Option<&'a str>) -> ObjectStream<'a>;

    /// Opens the content of one object as a stream of chunks.
    async fn fetch(&self, key: &str) -> std::result::Result<ByteStream, TransferError>;

    /// Human-readable location of the store (e.g., `s3://bucket`).
    fn location(&self) -> String;
}
