//! backfetch CLI
//!
//! Fetches recent backups from S3-compatible object storage.

use bf_cli_common::{format_bytes, format_duration_ms, init_logging};
use bf_error::EXIT_INTERNAL;
use bf_fetcher::RunSummary;
use clap::Parser;
use tracing::error;

mod args;
mod run;

use args::Cli;

#[tokio::main]
async fn main() {
    let args = Cli::parse();

    if let Err(e) = init_logging(args.log_level, args.log_file.as_deref()) {
        eprintln!("Error: {e:#}");
        std::process::exit(EXIT_INTERNAL);
    }

    let require_match = args.require_match;
    let code = match run::execute(args).await {
        Ok(summary) => {
            print_summary(&summary);
            run::exit_code(&summary, require_match)
        }
        Err(e) => {
            error!(error = %e, "Run failed");
            eprintln!("Error: {e}");
            e.exit_code()
        }
    };

    std::process::exit(code);
}

/// Report results to stderr.
fn print_summary(summary: &RunSummary) {
    eprintln!();
    eprintln!("Fetch completed:");
    eprintln!("  Objects listed:   {}", summary.objects_listed);
    eprintln!("  Objects selected: {}", summary.objects_selected);
    eprintln!("  Downloaded:       {}", summary.downloaded);
    eprintln!("  Skipped:          {}", summary.skipped);
    eprintln!("  Failed:           {}", summary.failed);
    eprintln!("  Transferred:      {}", format_bytes(summary.bytes_transferred));

    if let Some(duration) = summary.duration() {
        eprintln!("  Duration:         {}", format_duration_ms(duration.num_milliseconds()));
    }

    if summary.cancelled {
        eprintln!("  Run was cancelled before completion");
    }

    for failure in &summary.failures {
        eprintln!("  Failed: {} ({})", failure.key, failure.reason);
    }
}
