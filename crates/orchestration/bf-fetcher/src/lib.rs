//! bf-fetcher - recency-windowed bucket retrieval for backfetch.
//!
//! This crate implements the selection-and-retrieval pipeline:
//!
//! - Recursive, paginated object listing (S3 or in-memory)
//! - Selection by recency window and base-filename regex
//! - Idempotent downloads through temporary files and atomic renames
//! - Per-object outcomes fanned out to log and JSONL sinks, folded into a run summary
//!
//! # Example
//!
//! ```ignore
//! use bf_fetcher::{Fetcher, FetchConfig, LogSink, PatternFilter, S3Config, S3Store, SelectionCriteria};
//! use bf_fetcher::filter::parse_window;
//! use bf_fetcher::s3::create_s3_client;
//!
//! let s3_config = S3Config::new("backups")
//!     .with_prefix("nightly/")
//!     .with_endpoint("https://minio.example.com");
//! let client = create_s3_client(&s3_config).await?;
//! let store = S3Store::new(client, "backups");
//!
//! let criteria = SelectionCriteria::new(parse_window("24h")?, PatternFilter::new(r"^db_.*\.sql$")?)?;
//! let config = FetchConfig::new().with_destination("./downloads");
//!
//! let fetcher = Fetcher::new(store, Some("nightly/".to_string()), criteria, LogSink::new(), config);
//! let summary = fetcher.run().await?;
//! eprintln!("{} downloaded, {} failed", summary.downloaded, summary.failed);
//! ```

pub mod config;
pub mod download;
pub mod fetcher;
pub mod filter;
pub mod memory;
pub mod report;
pub mod s3;
pub mod sink;

pub use config::FetchConfig;
pub use download::Downloader;
pub use fetcher::Fetcher;
pub use filter::{Filter, PatternFilter, RecencyFilter, SelectionCriteria};
pub use memory::{Fault, MemoryStore};
pub use report::Reporter;
pub use s3::{RetryConfig, S3Config, S3Store, create_s3_client};
pub use sink::{FanoutSink, JsonlSink, LogSink};

pub use bf_traits::{ObjectStore, OutcomeSink};
pub use bf_types::{DownloadOutcome, ObjectDescriptor, OutcomeStatus, RunSummary};
