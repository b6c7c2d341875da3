//! Formatting helpers for diagnostic output.
//!
//! Trace lines and the ping summary go through this module so the console
//! and the core print timestamps and latency figures the same way.

/// Short rolling timestamp prefixed to trace lines.
///
/// Only the last four digits of the millisecond clock are kept, which is
/// enough to read the spacing between neighbouring lines.
///
/// # Examples
/// ```
/// use foresight_types::formatting::trace_stamp;
/// assert_eq!(trace_stamp(42), "[0042]");
/// assert_eq!(trace_stamp(123_456), "[3456]");
/// ```
pub fn trace_stamp(now_ms: u64) -> String {
    format!("[{:04}]", now_ms % 10_000)
}

/// Format a millisecond duration as seconds with two decimals.
///
/// # Examples
/// ```
/// use foresight_types::formatting::format_seconds;
/// assert_eq!(format_seconds(1_500), "1.50s");
/// assert_eq!(format_seconds(0), "0.00s");
/// ```
pub fn format_seconds(ms: u64) -> String {
    format!("{:.2}s", ms as f64 / 1_000.0)
}

/// Format latency statistics as a single chat line.
///
/// Jitter is the spread between the fastest and slowest sample in the window.
/// An empty window prints `???`.
///
/// # Examples
/// ```
/// use foresight_types::formatting::format_ping_summary;
/// assert_eq!(
///     format_ping_summary(53.33, 30, 80, 3),
///     "Ping: Avg=53 Min=30 Max=80 Jitter=50 Samples=3"
/// );
/// assert_eq!(format_ping_summary(0.0, 0, 0, 0), "Ping: ???");
/// ```
pub fn format_ping_summary(avg: f64, min: u32, max: u32, samples: usize) -> String {
    if samples == 0 {
        return "Ping: ???".to_string();
    }
    format!(
        "Ping: Avg={} Min={} Max={} Jitter={} Samples={}",
        avg.round() as i64,
        min,
        max,
        max.saturating_sub(min),
        samples
    )
}
