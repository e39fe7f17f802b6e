//! CLI argument definitions for backfetch.

use bf_cli_common::LogLevel;
use clap::Parser;
use std::path::PathBuf;

/// Fetch recent backups from S3-compatible storage.
///
/// Lists every object under a bucket prefix, selects those modified within
/// the recency window whose file name matches a regular expression, and
/// downloads them into a flat local directory. Files that are already
/// present with the same size are skipped, so reruns are cheap.
///
/// ## Examples
///
/// Last day of SQL dumps from MinIO:
///   backfetch -b backups -p nightly/ --endpoint http://minio:9000 \
///       --pattern '^db_.*\.sql$' --window 24h -d /srv/restore
///
/// Last week, case-insensitive, with a JSONL report:
///   backfetch -b backups --pattern '.*\.bak$' --ignore-case --window 7d \
///       --report /var/log/backfetch.jsonl
#[derive(Parser, Debug)]
#[command(name = "backfetch")]
#[command(version, about, long_about = None)]
pub struct Cli {
    // === S3 Configuration ===
    /// S3 bucket name
    #[arg(short, long, env = "BF_S3_BUCKET")]
    pub bucket: String,

    /// Key prefix to list under (recursively)
    #[arg(short, long, env = "BF_S3_PREFIX")]
    pub prefix: Option<String>,

    /// Custom S3 endpoint URL (MinIO, LocalStack)
    #[arg(long, env = "BF_S3_ENDPOINT")]
    pub endpoint: Option<String>,

    /// AWS region
    #[arg(long, env = "AWS_REGION", default_value = "us-east-1")]
    pub region: String,

    /// AWS access key ID
    #[arg(long, env = "AWS_ACCESS_KEY_ID")]
    pub access_key: Option<String>,

    /// AWS secret access key
    #[arg(long, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true)]
    pub secret_key: Option<String>,

    /// AWS profile name
    #[arg(long, env = "AWS_PROFILE")]
    pub profile: Option<String>,

    /// Retries for each listing page or object request
    #[arg(long, default_value = "3")]
    pub max_retries: u32,

    // === Selection ===
    /// Recency window (e.g. 90m, 24h, 7d, 2w; bare numbers are seconds)
    #[arg(long, env = "BF_WINDOW", default_value = "24h")]
    pub window: String,

    /// Regular expression matched from the start of each object's file name
    #[arg(long, env = "BF_PATTERN")]
    pub pattern: String,

    /// Match the pattern case-insensitively
    #[arg(long)]
    pub ignore_case: bool,

    /// Exit with status 5 when no object is selected
    #[arg(long)]
    pub require_match: bool,

    // === Download ===
    /// Local directory to download into
    #[arg(short, long, env = "BF_DESTINATION", default_value = "./downloads")]
    pub destination: PathBuf,

    /// Maximum concurrent transfers (must be >= 1)
    #[arg(long, default_value = "4", value_parser = parse_positive_usize)]
    pub concurrency: usize,

    /// Per-object transfer timeout (same syntax as --window)
    #[arg(long)]
    pub transfer_timeout: Option<String>,

    /// Create the destination directory when it does not exist
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub create_destination: bool,

    // === Reporting ===
    /// Append one JSON line per outcome and a final summary to this file
    #[arg(long, env = "BF_REPORT")]
    pub report: Option<PathBuf>,

    /// Also write logs as JSON lines to this file
    #[arg(long, env = "BF_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,
}

/// Parse a positive usize (>= 1).
fn parse_positive_usize(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if value < 1 {
        return Err(format!("{} is not in 1..", value));
    }
    Ok(value)
}
