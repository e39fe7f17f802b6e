//! The fetch pipeline: list, select, download, report.

use bf_error::{BfError, Result, TransferError};
use bf_traits::{ObjectStore, OutcomeSink};
use bf_types::{DownloadOutcome, ObjectDescriptor, RunSummary};
use chrono::Utc;
use futures::{StreamExt, future};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::pin::pin;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, trace, warn};

use crate::config::FetchConfig;
use crate::download::Downloader;
use crate::filter::Filter;
use crate::report::Reporter;

/// Runs one selection-and-retrieval pass over a store.
///
/// Listing, selection and transfers overlap: objects are filtered as pages
/// arrive and selected objects are handed to a bounded pool of transfers.
/// Per-object failures are recorded and never end the run. A listing
/// failure stops dispatch, lets in-flight transfers finish, reports the
/// partial summary to the sink and then surfaces as
/// [`BfError::StorageUnavailable`].
pub struct Fetcher<S, F, K> {
    store: S,
    prefix: Option<String>,
    filter: F,
    sink: K,
    config: FetchConfig,
    cancel: CancellationToken,
}

impl<S, F, K> Fetcher<S, F, K>
where
    S: ObjectStore,
    F: Filter,
    K: OutcomeSink,
{
    pub fn new(store: S, prefix: Option<String>, filter: F, sink: K, config: FetchConfig) -> Self {
        Self {
            store,
            prefix,
            filter,
            sink,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Use `cancel` to stop the run early.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Execute the run and return its summary.
    pub async fn run(&self) -> Result<RunSummary> {
        self.config.validate()?;
        self.config.prepare_destination().await?;

        let started_at = Utc::now();
        info!(
            location = %self.store.location(),
            prefix = self.prefix.as_deref().unwrap_or_default(),
            filter = %self.filter.description(),
            destination = %self.config.destination.display(),
            concurrency = self.config.concurrency,
            "Starting fetch"
        );

        let downloader = Downloader::new(
            &self.config.destination,
            self.config.transfer_timeout,
            self.cancel.clone(),
        );
        let mut planner = Planner::new(&self.filter, &downloader);
        let mut reporter = Reporter::new(started_at);

        {
            let store = &self.store;
            let downloader = &downloader;

            let outcomes = store
                .list(self.prefix.as_deref())
                .take_until(self.cancel.cancelled())
                .scan(&mut planner, |planner, item| future::ready(planner.plan(item)))
                .filter_map(future::ready)
                .map(move |planned| async move {
                    match planned {
                        Planned::Transfer(obj) => downloader.download(store, &obj).await,
                        Planned::Resolved(outcome) => outcome,
                    }
                })
                .buffer_unordered(self.config.concurrency);
            let mut outcomes = pin!(outcomes);

            while let Some(outcome) = outcomes.next().await {
                if let Err(e) = self.sink.record(&outcome).await {
                    warn!(key = %outcome.key, error = %e, "Failed to record outcome");
                }
                reporter.record(&outcome);
            }
        }

        let cancelled = self.cancel.is_cancelled();
        if cancelled {
            warn!("Run cancelled, no further objects were dispatched");
        }

        if planner.selected == 0 && planner.listing_error.is_none() && !cancelled {
            warn!(listed = planner.listed, "No recent backups found");
        }

        let summary = reporter.finish(planner.listed, planner.selected, cancelled);
        if let Err(e) = self.sink.finish(&summary).await {
            warn!(error = %e, "Failed to record run summary");
        }

        match planner.listing_error {
            Some(e) => Err(e),
            None => Ok(summary),
        }
    }
}

enum Planned {
    Transfer(ObjectDescriptor),
    Resolved(DownloadOutcome),
}

/// Applies selection and basename claiming to listed objects.
struct Planner<'a, F> {
    filter: &'a F,
    downloader: &'a Downloader,
    claimed: HashMap<String, String>,
    listed: usize,
    selected: usize,
    listing_error: Option<BfError>,
}

impl<'a, F: Filter> Planner<'a, F> {
    fn new(filter: &'a F, downloader: &'a Downloader) -> Self {
        Self {
            filter,
            downloader,
            claimed: HashMap::new(),
            listed: 0,
            selected: 0,
            listing_error: None,
        }
    }

    /// `None` ends the pipeline; `Some(None)` drops the object.
    fn plan(&mut self, item: Result<ObjectDescriptor>) -> Option<Option<Planned>> {
        let obj = match item {
            Ok(obj) => obj,
            Err(e) => {
                error!(error = %e, listed = self.listed, "Listing failed, stopping dispatch");
                self.listing_error = Some(e);
                return None;
            }
        };

        self.listed += 1;
        if !self.filter.matches(&obj) {
            trace!(key = %obj.key, "Not selected");
            return Some(None);
        }
        self.selected += 1;
        info!(
            key = %obj.key,
            size = obj.size,
            last_modified = ?obj.last_modified,
            "Recent backup found"
        );

        let planned = match self.claimed.entry(obj.basename().to_string()) {
            Entry::Occupied(first) => {
                let target = self.downloader.target_path(&obj);
                let reason = TransferError::Collision(first.get().clone());
                warn!(key = %obj.key, first = %first.get(), "Local path already claimed");
                Planned::Resolved(DownloadOutcome::failed(&obj.key, target, reason))
            }
            Entry::Vacant(slot) => {
                slot.insert(obj.key.clone());
                Planned::Transfer(obj)
            }
        };
        Some(Some(planned))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{PatternFilter, SelectionCriteria};
    use crate::memory::{Fault, MemoryStore};
    use crate::sink::testing::{CollectingSink, FailingSink};
    use chrono::Duration;
    use std::path::Path;
    use tempfile::TempDir;

    fn criteria(pattern: &str) -> SelectionCriteria {
        SelectionCriteria::new(Duration::hours(24), PatternFilter::new(pattern).unwrap()).unwrap()
    }

    fn fetcher<K: OutcomeSink>(
        store: MemoryStore,
        pattern: &str,
        sink: K,
        dest: &Path,
    ) -> Fetcher<MemoryStore, SelectionCriteria, K> {
        Fetcher::new(
            store,
            None,
            criteria(pattern),
            sink,
            FetchConfig::new().with_destination(dest),
        )
    }

    fn files_in(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_selects_recent_matching_objects_recursively() {
        let dir = TempDir::new().unwrap();
        let now = Utc::now();
        let store = MemoryStore::new();
        store.insert("backups/", "", now);
        store.insert("backups/db_2024.sql", "fresh", now - Duration::hours(1));
        store.insert("backups/db_2023.sql", "stale", now - Duration::days(3));
        store.insert("backups/notes.txt", "text", now);
        store.insert("backups/a/b/c/db_nested.sql", "deep", now);

        let sink = CollectingSink::default();
        let summary = fetcher(store, r"^db_.*\.sql$", sink.clone(), dir.path())
            .run()
            .await
            .unwrap();

        assert_eq!(summary.objects_listed, 5);
        assert_eq!(summary.objects_selected, 2);
        assert_eq!(summary.downloaded, 2);
        assert_eq!(summary.bytes_transferred, 9);
        assert!(summary.is_success());
        assert_eq!(files_in(dir.path()), vec!["db_2024.sql", "db_nested.sql"]);
        assert_eq!(sink.outcomes.lock().len(), 2);
        assert_eq!(sink.summaries.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_pattern_matches_basename_only() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::new();
        store.insert("db_dir/archive.tar", "x", Utc::now());

        let summary = fetcher(store, "^db_", CollectingSink::default(), dir.path())
            .run()
            .await
            .unwrap();

        assert_eq!(summary.objects_selected, 0);
        assert!(files_in(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_rerun_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::new();
        store.insert("a/full.bak", "0123456789", Utc::now());
        store.insert("b/diff.bak", "01234", Utc::now());

        let fetcher = fetcher(store, r".*\.bak$", CollectingSink::default(), dir.path());
        let first = fetcher.run().await.unwrap();
        let second = fetcher.run().await.unwrap();

        assert_eq!(first.downloaded, 2);
        assert_eq!(second.downloaded, 0);
        assert_eq!(second.skipped, 2);
        assert_eq!(second.bytes_transferred, 0);
        assert_eq!(fetcher.store().total_fetches(), 2);
    }

    #[tokio::test]
    async fn test_runs_observe_current_store_contents() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::new();
        store.insert("old.bak", "1", Utc::now());

        let fetcher = fetcher(store, r".*\.bak$", CollectingSink::default(), dir.path());
        fetcher.run().await.unwrap();

        fetcher.store().insert("new.bak", "22", Utc::now());
        let second = fetcher.run().await.unwrap();

        assert_eq!(second.objects_selected, 2);
        assert_eq!(second.downloaded, 1);
        assert_eq!(second.skipped, 1);
        assert_eq!(fetcher.store().fetch_count("new.bak"), 1);
        assert_eq!(fetcher.store().fetch_count("old.bak"), 1);
    }

    #[tokio::test]
    async fn test_basename_collision_keeps_first_key() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::new();
        store.insert("a/dump.sql", "first", Utc::now());
        store.insert("b/dump.sql", "second!", Utc::now());

        let sink = CollectingSink::default();
        let summary = fetcher(store, r".*\.sql$", sink.clone(), dir.path())
            .run()
            .await
            .unwrap();

        assert_eq!(summary.downloaded, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.failures[0].key, "b/dump.sql");
        assert_eq!(summary.failures[0].reason, "local path collision with a/dump.sql");
        assert_eq!(std::fs::read(dir.path().join("dump.sql")).unwrap(), b"first");
    }

    #[tokio::test]
    async fn test_transfer_failure_is_not_fatal() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::new();
        store.insert("a.bak", "aaaaaaaa", Utc::now());
        store.insert("b.bak", "bbbbbbbb", Utc::now());
        store.insert("c.bak", "cccccccc", Utc::now());
        store.inject_fault("b.bak", Fault::Truncate(3));

        let summary = fetcher(store, r".*\.bak$", CollectingSink::default(), dir.path())
            .run()
            .await
            .unwrap();

        assert_eq!(summary.downloaded, 2);
        assert_eq!(summary.failed, 1);
        assert!(summary.failures[0].reason.contains("size mismatch"));
        assert_eq!(files_in(dir.path()), vec!["a.bak", "c.bak"]);
    }

    #[tokio::test]
    async fn test_listing_failure_is_storage_unavailable() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::new();
        store.insert("a.bak", "a", Utc::now());
        store.fail_listing("NoSuchBucket");

        let sink = CollectingSink::default();
        let result = fetcher(store, r".*\.bak$", sink.clone(), dir.path())
            .run()
            .await;

        assert!(matches!(result, Err(BfError::StorageUnavailable(_))));
        assert_eq!(sink.summaries.lock().len(), 1);
        assert!(files_in(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_listing_failure_partway_keeps_completed_work() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::new();
        store.insert("a.bak", "aaaa", Utc::now());
        store.insert("b.bak", "bbbb", Utc::now());
        store.insert("c.bak", "cccc", Utc::now());
        store.fail_listing_after(1, "page 2 failed");

        let sink = CollectingSink::default();
        let fetcher = fetcher(store, r".*\.bak$", sink.clone(), dir.path());
        let result = fetcher.run().await;

        assert!(matches!(result, Err(BfError::StorageUnavailable(r)) if r == "page 2 failed"));
        assert_eq!(sink.outcomes.lock().len(), 1);
        let summaries = sink.summaries.lock();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].objects_listed, 1);
        assert_eq!(summaries[0].objects_selected, 1);
        assert_eq!(summaries[0].downloaded, 1);
        assert_eq!(fetcher.store().fetch_count("b.bak"), 0);
        assert_eq!(files_in(dir.path()), vec!["a.bak"]);
    }

    #[tokio::test]
    async fn test_cancel_during_transfer_removes_partial_files() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::new();
        store.insert("a.bak", "aaaaaaaaaaaa", Utc::now());
        store.insert("b.bak", "bbbbbbbbbbbb", Utc::now());
        store.inject_fault("a.bak", Fault::Stall(4));
        store.inject_fault("b.bak", Fault::Stall(8));

        let cancel = CancellationToken::new();
        let sink = CollectingSink::default();
        let fetcher =
            fetcher(store, r".*\.bak$", sink.clone(), dir.path()).with_cancellation(cancel.clone());
        let trigger = async {
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            cancel.cancel();
        };
        let (result, ()) = tokio::join!(fetcher.run(), trigger);
        let summary = result.unwrap();

        assert!(summary.cancelled);
        assert_eq!(summary.failed, 2);
        assert!(summary.failures.iter().all(|f| f.reason.ends_with("cancelled")));
        assert_eq!(sink.outcomes.lock().len(), 2);
        assert!(files_in(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_run_dispatches_nothing() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::new();
        store.insert("a.bak", "a", Utc::now());

        let cancel = CancellationToken::new();
        cancel.cancel();
        let fetcher =
            fetcher(store, r".*\.bak$", CollectingSink::default(), dir.path()).with_cancellation(cancel);
        let summary = fetcher.run().await.unwrap();

        assert!(summary.cancelled);
        assert_eq!(summary.processed(), 0);
        assert_eq!(fetcher.store().total_fetches(), 0);
    }

    #[tokio::test]
    async fn test_sink_errors_do_not_abort() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::new();
        store.insert("a.bak", "a", Utc::now());

        let summary = fetcher(store, r".*\.bak$", FailingSink, dir.path())
            .run()
            .await
            .unwrap();

        assert_eq!(summary.downloaded, 1);
    }

    #[tokio::test]
    async fn test_many_objects_with_bounded_pool() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::new();
        for i in 0..25 {
            store.insert(format!("nightly/{i:02}/part_{i:02}.bak"), vec![b'x'; i + 1], Utc::now());
        }

        let fetcher = Fetcher::new(
            store,
            Some("nightly/".to_string()),
            criteria(r"^part_\d+\.bak$"),
            CollectingSink::default(),
            FetchConfig::new()
                .with_destination(dir.path())
                .with_concurrency(3),
        );
        let summary = fetcher.run().await.unwrap();

        assert_eq!(summary.downloaded, 25);
        assert_eq!(summary.bytes_transferred, (1..=25).sum::<u64>());
        assert_eq!(files_in(dir.path()).len(), 25);
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected_before_listing() {
        let dir = TempDir::new().unwrap();
        let store = MemoryStore::new();
        store.fail_listing("should not be reached");

        let fetcher = Fetcher::new(
            store,
            None,
            criteria(".*"),
            CollectingSink::default(),
            FetchConfig::new()
                .with_destination(dir.path())
                .with_concurrency(0),
        );

        assert!(matches!(
            fetcher.run().await,
            Err(BfError::ConfigurationInvalid(_))
        ));
    }
}
