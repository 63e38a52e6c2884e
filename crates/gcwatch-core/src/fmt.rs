//! Shared formatting helpers for plain-text output.

/// Format byte count as human-readable size.
///
/// `"1.5 GiB"`, `"100.3 MiB"`, `"50.0 KiB"`, `"512 B"`. Negative values are
/// the runtime's "undefined" marker and render as `"-"`.
pub fn format_bytes(bytes: i64) -> String {
    if bytes < 0 {
        return "-".to_string();
    }
    let f = bytes as f64;
    if bytes >= 1024 * 1024 * 1024 {
        format!("{:.1} GiB", f / (1024.0 * 1024.0 * 1024.0))
    } else if bytes >= 1024 * 1024 {
        format!("{:.1} MiB", f / (1024.0 * 1024.0))
    } else if bytes >= 1024 {
        format!("{:.1} KiB", f / 1024.0)
    } else {
        format!("{} B", bytes)
    }
}

/// Format milliseconds as seconds with millisecond precision: `"1.234s"`.
pub fn format_millis(ms: u64) -> String {
    format!("{}.{:03}s", ms / 1000, ms % 1000)
}

/// Format fractional seconds: `"0.0400s"`.
pub fn format_secs(secs: f64) -> String {
    format!("{:.4}s", secs)
}
