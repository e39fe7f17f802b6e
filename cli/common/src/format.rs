//! Formatting utilities for CLI output.

/// Format bytes as human-readable string.
///
/// # Examples
///
/// ```
/// use bf_cli_common::format_bytes;
///
/// assert_eq!(format_bytes(500), "500 bytes");
/// assert_eq!(format_bytes(1536), "1.50 KB");
/// assert_eq!(format_bytes(1_073_741_824), "1.00 GB");
/// ```
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];

    if bytes < 1024 {
        return format!("{bytes} bytes");
    }

    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.2} {}", UNITS[unit])
}

/// Format a millisecond duration as seconds.
///
/// ```
/// use bf_cli_common::format_duration_ms;
///
/// assert_eq!(format_duration_ms(1500), "1.50s");
/// ```
pub fn format_duration_ms(ms: i64) -> String {
    format!("{:.2}s", ms as f64 / 1000.0)
}
