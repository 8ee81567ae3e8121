//! Formatting of names and dates for the current-item view

use chrono::{DateTime, TimeZone};

/// Default maximum displayed name length, in characters
pub const DEFAULT_MAX_NAME_LENGTH: usize = 30;

/// Format used for capture dates
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Shortens a path for display
///
/// Paths longer than `max` characters become `"..."` followed by their last
/// `max - 3` characters; shorter paths are returned unchanged.
#[must_use]
pub fn truncate_name(path: &str, max: usize) -> String {
    let count = path.chars().count();
    if count <= max {
        return path.to_string();
    }
    let keep = max.saturating_sub(3);
    let tail: String = path.chars().skip(count - keep).collect();
    format!("...{tail}")
}

/// Formats a UNIX timestamp in `tz`
///
/// Returns `None` for timestamps outside the representable range.
#[must_use]
pub fn format_timestamp<Tz>(timestamp: f64, tz: &Tz) -> Option<String>
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    if !timestamp.is_finite() {
        return None;
    }
    #[allow(clippy::cast_possible_truncation)]
    let utc = DateTime::from_timestamp(timestamp.floor() as i64, 0)?;
    Some(utc.with_timezone(tz).format(DATE_FORMAT).to_string())
}
