//! End-to-end fetch tests against LocalStack S3.

use crate::common::{CollectingSink, LocalStackTestContext};
use bf_error::BfError;
use bf_fetcher::filter::parse_window;
use bf_fetcher::{
    FetchConfig, Fetcher, ObjectStore, OutcomeStatus, PatternFilter, RetryConfig,
    SelectionCriteria,
};
use futures::TryStreamExt;
use tempfile::TempDir;

fn criteria(pattern: &str) -> SelectionCriteria {
    SelectionCriteria::new(parse_window("1h").unwrap(), PatternFilter::new(pattern).unwrap())
        .unwrap()
}

#[tokio::test]
#[ignore = "requires LocalStack"]
async fn test_listing_is_recursive() {
    let ctx = LocalStackTestContext::new().await;

    if !ctx.is_available().await {
        eprintln!("LocalStack not available, skipping test");
        return;
    }

    let bucket = "bf-recursive-bucket";
    ctx.create_bucket(bucket).await.unwrap();
    ctx.put_object(bucket, "prefix/file", b"top").await.unwrap();
    ctx.put_object(bucket, "prefix/a/b/c/file", b"deep").await.unwrap();
    ctx.put_object(bucket, "elsewhere/file", b"no").await.unwrap();

    let store = ctx.store(bucket).await;
    let mut keys: Vec<String> = store
        .list(Some("prefix/"))
        .map_ok(|obj| obj.key)
        .try_collect()
        .await
        .unwrap();
    keys.sort();

    assert_eq!(keys, vec!["prefix/a/b/c/file", "prefix/file"]);
}

#[tokio::test]
#[ignore = "requires LocalStack"]
async fn test_fetch_is_idempotent() {
    let ctx = LocalStackTestContext::new().await;

    if !ctx.is_available().await {
        eprintln!("LocalStack not available, skipping test");
        return;
    }

    let bucket = "bf-idempotent-bucket";
    ctx.create_bucket(bucket).await.unwrap();
    ctx.put_object(bucket, "nightly/2024/db_2024.sql", b"create table t;")
        .await
        .unwrap();
    ctx.put_object(bucket, "nightly/2024/DB_2024.sql", b"upper")
        .await
        .unwrap();
    ctx.put_object(bucket, "nightly/notes.txt", b"ignore me")
        .await
        .unwrap();

    let dir = TempDir::new().unwrap();
    let sink = CollectingSink::default();
    let fetcher = Fetcher::new(
        ctx.store(bucket).await,
        Some("nightly/".to_string()),
        criteria(r"^db_.*\.sql$"),
        sink.clone(),
        FetchConfig::new().with_destination(dir.path()),
    );

    let first = fetcher.run().await.unwrap();
    assert_eq!(first.objects_selected, 1);
    assert_eq!(first.downloaded, 1);
    assert_eq!(
        std::fs::read(dir.path().join("db_2024.sql")).unwrap(),
        b"create table t;"
    );

    let second = fetcher.run().await.unwrap();
    assert_eq!(second.downloaded, 0);
    assert_eq!(second.skipped, 1);
    assert!(
        sink.outcomes()
            .iter()
            .any(|o| o.status == OutcomeStatus::Skipped)
    );
    assert_eq!(sink.summaries().len(), 2);
}

#[tokio::test]
#[ignore = "requires LocalStack"]
async fn test_missing_bucket_is_storage_unavailable() {
    let ctx = LocalStackTestContext::new().await;

    if !ctx.is_available().await {
        eprintln!("LocalStack not available, skipping test");
        return;
    }

    let dir = TempDir::new().unwrap();
    let store = ctx
        .store("bf-bucket-that-does-not-exist")
        .await
        .with_retry(RetryConfig::disabled());
    let fetcher = Fetcher::new(
        store,
        None,
        criteria(".*"),
        CollectingSink::default(),
        FetchConfig::new().with_destination(dir.path()),
    );

    let result = fetcher.run().await;
    assert!(matches!(result, Err(BfError::StorageUnavailable(_))));
}
