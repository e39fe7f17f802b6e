//! LocalStack test context and utilities.

use async_trait::async_trait;
use aws_sdk_s3::Client as S3Client;
use bf_error::Result;
use bf_fetcher::{
    DownloadOutcome, OutcomeSink, RunSummary, S3Config, S3Store, create_s3_client,
};
use parking_lot::Mutex;
use std::sync::Arc;

/// LocalStack test context providing an S3 client.
pub struct LocalStackTestContext {
    pub s3: S3Client,
    pub endpoint: String,
    pub region: String,
}

impl LocalStackTestContext {
    /// Create a new LocalStack test context.
    ///
    /// Uses the `LOCALSTACK_ENDPOINT` environment variable if set,
    /// otherwise defaults to `http://localhost:4566`.
    pub async fn new() -> Self {
        let endpoint = std::env::var("LOCALSTACK_ENDPOINT")
            .unwrap_or_else(|_| "http://localhost:4566".to_string());
        let region = "us-east-1".to_string();

        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_sdk_s3::config::Region::new(region.clone()))
            .endpoint_url(&endpoint)
            .credentials_provider(aws_sdk_s3::config::Credentials::new(
                "test", "test", None, None, "localstack",
            ))
            .load()
            .await;
        let s3_config = aws_sdk_s3::config::Builder::from(&config)
            .force_path_style(true)
            .build();

        Self {
            s3: S3Client::from_conf(s3_config),
            endpoint,
            region,
        }
    }

    /// Check if LocalStack is available and healthy.
    pub async fn is_available(&self) -> bool {
        self.s3.list_buckets().send().await.is_ok()
    }

    /// Create an S3 bucket for testing.
    pub async fn create_bucket(&self, name: &str) -> std::result::Result<(), aws_sdk_s3::Error> {
        let buckets = self.s3.list_buckets().send().await?;
        let exists = buckets
            .buckets()
            .iter()
            .any(|b| b.name().unwrap_or_default() == name);

        if !exists {
            self.s3.create_bucket().bucket(name).send().await?;
        }
        Ok(())
    }

    /// Upload an object.
    pub async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: &[u8],
    ) -> std::result::Result<(), aws_sdk_s3::Error> {
        self.s3
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(data.to_vec().into())
            .send()
            .await?;
        Ok(())
    }

    /// Build a store for `bucket` pointed at LocalStack.
    pub async fn store(&self, bucket: &str) -> S3Store {
        let config = S3Config::new(bucket)
            .with_endpoint(&self.endpoint)
            .with_region(&self.region)
            .with_credentials("test", "test");
        let client = create_s3_client(&config).await.unwrap();
        S3Store::new(client, bucket)
    }
}

/// Sink that keeps every outcome and summary for assertions.
#[derive(Clone, Default)]
pub struct CollectingSink {
    outcomes: Arc<Mutex<Vec<DownloadOutcome>>>,
    summaries: Arc<Mutex<Vec<RunSummary>>>,
}

impl CollectingSink {
    pub fn outcomes(&self) -> Vec<DownloadOutcome> {
        self.outcomes.lock().clone()
    }

    pub fn summaries(&self) -> Vec<RunSummary> {
        self.summaries.lock().clone()
    }
}

#[async_trait]
impl OutcomeSink for CollectingSink {
    async fn record(&self, outcome: &DownloadOutcome) -> Result<()> {
        self.outcomes.lock().push(outcome.clone());
        Ok(())
    }

    async fn finish(&self, summary: &RunSummary) -> Result<()> {
        self.summaries.lock().push(summary.clone());
        Ok(())
    }
}
