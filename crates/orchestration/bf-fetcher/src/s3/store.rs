//! S3-backed object store.

use async_stream::try_stream;
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::DisplayErrorContext;
use bf_error::{BfError, Result, TransferError};
use bf_traits::{ByteStream, ObjectStore, ObjectStream};
use bf_types::ObjectDescriptor;
use bytes::Bytes;
use chrono::DateTime;
use futures::Stream;
use tracing::{debug, trace};

use super::retry::{RetryConfig, with_retry};

/// Object store over an S3-compatible bucket.
#[derive(Debug, Clone)]
pub struct S3Store {
    client: Client,
    bucket: String,
    retry: RetryConfig,
}

impl S3Store {
    /// Create a store for `bucket` using an existing client.
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            retry: RetryConfig::default(),
        }
    }

    /// Set the retry policy for listing and `GetObject` requests.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    fn list<'a>(&'a self, prefix: Option<&'a str>) -> ObjectStream<'a> {
        Box::pin(list_objects(&self.client, &self.bucket, prefix, &self.retry))
    }

    async fn fetch(&self, key: &str) -> std::result::Result<ByteStream, TransferError> {
        debug!(bucket = %self.bucket, key, "Opening object");

        let resp = with_retry(&self.retry, "get_object", || {
            let req = self.client.get_object().bucket(&self.bucket).key(key);
            async move {
                req.send().await.map_err(|e| {
                    TransferError::Network(format!("GetObject failed: {}", DisplayErrorContext(e)))
                })
            }
        })
        .await?;

        let mut body = resp.body;
        let key = key.to_string();
        let stream = async_stream::stream! {
            loop {
                match body.try_next().await {
                    Ok(Some(chunk)) => {
                        trace!(key = %key, len = chunk.len(), "Received chunk");
                        yield Ok::<Bytes, TransferError>(chunk);
                    }
                    Ok(None) => break,
                    Err(e) => {
                        yield Err(TransferError::Network(format!("body stream interrupted: {e}")));
                        break;
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }

    fn location(&self) -> String {
        format!("s3://{}", self.bucket)
    }
}

/// List objects in an S3 bucket recursively.
///
/// Returns a stream of [`ObjectDescriptor`] items, following continuation
/// tokens until the listing is exhausted. No delimiter is sent, so keys in
/// nested virtual folders are included. Folder placeholders are yielded as
/// well; selection decides what to do with them.
///
/// Each page request is retried per `retry`. A page that still fails yields
/// a single [`BfError::StorageUnavailable`] and ends the stream.
pub fn list_objects<'a>(
    client: &'a Client,
    bucket: &'a str,
    prefix: Option<&'a str>,
    retry: &'a RetryConfig,
) -> impl Stream<Item = Result<ObjectDescriptor>> + Send + 'a {
    try_stream! {
        let mut continuation_token: Option<String> = None;
        let mut page = 0usize;

        loop {
            let resp = with_retry(retry, "list_objects_v2", || {
                let mut req = client.list_objects_v2().bucket(bucket);
                if let Some(prefix) = prefix {
                    req = req.prefix(prefix);
                }
                if let Some(token) = &continuation_token {
                    req = req.continuation_token(token);
                }
                async move { req.send().await.map_err(|e| DisplayErrorContext(e).to_string()) }
            })
            .await
            .map_err(|e| {
                BfError::StorageUnavailable(format!("listing s3://{bucket} failed: {e}"))
            })?;

            page += 1;
            trace!(bucket, page, count = resp.contents().len(), "Listed page");

            for obj in resp.contents() {
                let key = obj.key().unwrap_or_default();
                if key.is_empty() {
                    continue;
                }

                let last_modified = obj
                    .last_modified()
                    .and_then(|t| DateTime::from_timestamp(t.secs(), t.subsec_nanos()));

                yield ObjectDescriptor {
                    key: key.to_string(),
                    size: obj.size().unwrap_or(0).max(0) as u64,
                    last_modified,
                };
            }

            if resp.is_truncated() == Some(true) {
                continuation_token = resp.next_continuation_token().map(str::to_string);
                if continuation_token.is_none() {
                    break;
                }
            } else {
                break;
            }
        }
    }
}
