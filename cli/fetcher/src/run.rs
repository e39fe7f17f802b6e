//! Main execution logic for backfetch.

use bf_error::{
    BfError, EXIT_CANCELLED, EXIT_NO_MATCH, EXIT_OK, EXIT_PARTIAL_FAILURE, Result,
};
use bf_fetcher::filter::parse_window;
use bf_fetcher::{
    FanoutSink, FetchConfig, Fetcher, JsonlSink, LogSink, PatternFilter, RetryConfig, RunSummary,
    S3Config, S3Store, SelectionCriteria, create_s3_client,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use crate::args::Cli;

/// Execute one fetch run with the provided arguments.
pub async fn execute(args: Cli) -> Result<RunSummary> {
    let criteria = build_criteria(&args)?;
    let config = build_fetch_config(&args)?;

    let s3_config = build_s3_config(&args);
    let client = create_s3_client(&s3_config).await?;
    let store = S3Store::new(client, &args.bucket)
        .with_retry(RetryConfig::default().with_max_retries(args.max_retries));

    let mut sink = FanoutSink::new().with(LogSink::new());
    if let Some(path) = &args.report {
        sink = sink.with(JsonlSink::create(path).await?);
    }

    let cancel = CancellationToken::new();
    spawn_shutdown_listener(cancel.clone());

    Fetcher::new(store, args.prefix.clone(), criteria, sink, config)
        .with_cancellation(cancel)
        .run()
        .await
}

/// Map a completed run to the process exit status.
pub fn exit_code(summary: &RunSummary, require_match: bool) -> i32 {
    if summary.cancelled {
        EXIT_CANCELLED
    } else if summary.has_failures() {
        EXIT_PARTIAL_FAILURE
    } else if require_match && summary.objects_selected == 0 {
        EXIT_NO_MATCH
    } else {
        EXIT_OK
    }
}

fn build_s3_config(args: &Cli) -> S3Config {
    let mut s3_config = S3Config::new(&args.bucket).with_region(&args.region);

    if let Some(prefix) = &args.prefix {
        s3_config = s3_config.with_prefix(prefix);
    }

    if let Some(endpoint) = &args.endpoint {
        s3_config = s3_config.with_endpoint(endpoint);
    }

    if let (Some(access_key), Some(secret_key)) = (&args.access_key, &args.secret_key) {
        s3_config = s3_config.with_credentials(access_key, secret_key);
    }

    if let Some(profile) = &args.profile {
        s3_config = s3_config.with_profile(profile);
    }

    s3_config
}

fn build_criteria(args: &Cli) -> Result<SelectionCriteria> {
    let window = parse_window(&args.window)?;
    let pattern = if args.ignore_case {
        PatternFilter::case_insensitive(&args.pattern)?
    } else {
        PatternFilter::new(&args.pattern)?
    };
    SelectionCriteria::new(window, pattern)
}

fn build_fetch_config(args: &Cli) -> Result<FetchConfig> {
    let mut config = FetchConfig::new()
        .with_destination(&args.destination)
        .with_concurrency(args.concurrency)
        .with_create_destination(args.create_destination);

    if let Some(timeout) = &args.transfer_timeout {
        let timeout = parse_window(timeout)?
            .to_std()
            .map_err(|e| BfError::config(format!("invalid transfer timeout: {e}")))?;
        config = config.with_transfer_timeout(timeout);
    }

    config.validate()?;
    Ok(config)
}

fn spawn_shutdown_listener(cancel: CancellationToken) {
    tokio::spawn(async move {
        match shutdown_signal().await {
            Ok(()) => {
                warn!("Received shutdown signal, cancelling in-flight transfers");
                cancel.cancel();
            }
            Err(e) => error!(error = %e, "Unable to listen for shutdown signal"),
        }
    });
}

#[cfg(unix)]
async fn shutdown_signal() -> std::io::Result<()> {
    let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())?;
    tokio::select! {
        result = signal::ctrl_c() => result,
        _ = terminate.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> std::io::Result<()> {
    signal::ctrl_c().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use bf_error::EXIT_CONFIG;
    use bf_fetcher::{DownloadOutcome, Filter};
    use clap::Parser;

    fn cli(extra: &[&str]) -> Cli {
        let mut argv = vec!["backfetch", "-b", "backups", "--pattern", r"^db_.*\.sql$"];
        argv.extend_from_slice(extra);
        Cli::try_parse_from(argv).unwrap()
    }

    fn summary_with(outcomes: &[DownloadOutcome], selected: usize) -> RunSummary {
        let mut summary = RunSummary::new();
        for outcome in outcomes {
            summary.record(outcome);
        }
        summary.objects_selected = selected;
        summary
    }

    #[test]
    fn test_exit_code_success() {
        let summary = summary_with(&[DownloadOutcome::downloaded("a", "/d/a", 1)], 1);
        assert_eq!(exit_code(&summary, true), EXIT_OK);
    }

    #[test]
    fn test_exit_code_partial_failure() {
        let summary = summary_with(
            &[
                DownloadOutcome::downloaded("a", "/d/a", 1),
                DownloadOutcome::failed("b", "/d/b", "network error: reset"),
            ],
            2,
        );
        assert_eq!(exit_code(&summary, false), EXIT_PARTIAL_FAILURE);
    }

    #[test]
    fn test_exit_code_no_match() {
        let summary = summary_with(&[], 0);
        assert_eq!(exit_code(&summary, false), EXIT_OK);
        assert_eq!(exit_code(&summary, true), EXIT_NO_MATCH);
    }

    #[test]
    fn test_exit_code_cancelled_wins() {
        let mut summary = summary_with(&[DownloadOutcome::failed("a", "/d/a", "cancelled")], 1);
        summary.cancelled = true;
        assert_eq!(exit_code(&summary, false), EXIT_CANCELLED);
    }

    #[test]
    fn test_build_criteria_respects_ignore_case() {
        let sensitive = build_criteria(&cli(&[])).unwrap();
        let insensitive = build_criteria(&cli(&["--ignore-case"])).unwrap();

        assert!(!sensitive.pattern().matches_key("backups/DB_2024.sql"));
        assert!(insensitive.pattern().matches_key("backups/DB_2024.sql"));
        assert!(sensitive.description().contains("pattern("));
    }

    #[test]
    fn test_invalid_window_is_config_error() {
        let err = build_criteria(&cli(&["--window", "0h"])).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_CONFIG);
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let args = Cli::try_parse_from(["backfetch", "-b", "backups", "--pattern", "db_("]).unwrap();
        let err = build_criteria(&args).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_CONFIG);
    }

    #[test]
    fn test_transfer_timeout_is_parsed() {
        let config = build_fetch_config(&cli(&["--transfer-timeout", "90s"])).unwrap();
        assert_eq!(config.transfer_timeout, Some(std::time::Duration::from_secs(90)));

        assert!(build_fetch_config(&cli(&["--transfer-timeout", "soon"])).is_err());
    }

    #[test]
    fn test_s3_config_from_args() {
        let args = cli(&["--endpoint", "http://minio:9000", "-p", "nightly/"]);
        let config = build_s3_config(&args);

        assert_eq!(config.bucket, "backups");
        assert_eq!(config.prefix.as_deref(), Some("nightly/"));
        assert_eq!(config.endpoint.as_deref(), Some("http://minio:9000"));
    }
}
