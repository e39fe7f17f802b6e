//! S3 client, listing, and object retrieval.
//!
//! This module provides the S3-backed [`ObjectStore`](bf_traits::ObjectStore):
//! - Client configuration with MinIO/LocalStack support
//! - Recursive paginated listing as a lazy stream
//! - Streaming `GetObject` bodies
//! - Exponential backoff for transient errors

mod client;
mod retry;
mod store;

pub use client::{S3Config, create_s3_client};
pub use retry::{ErrorClassification, RetryConfig, classify_error, with_retry};
pub use store::{S3Store, list_objects};
