//! Display grouping of the rendered window
//!
//! Tag-filter windows are split at calendar-day boundaries, prompt windows
//! into 5%-wide score bands. Groups are contiguous runs of the rendered
//! order and are recomputed from scratch whenever the window changes.

use super::search::SearchMode;
use crate::api::MediaItem;
use chrono::{DateTime, NaiveDate, TimeZone};
use std::fmt;

/// Width of a score band, in percent
pub const BAND_WIDTH: u8 = 5;

/// What a group has in common
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKey {
    /// Same calendar day in the display time zone
    Day(NaiveDate),
    /// Score in `[lower, lower + 5)` percent; the top band includes 100%
    Band { lower: u8 },
    /// Timestamp or score could not be interpreted
    Unknown,
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Day(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            Self::Band { lower } => write!(f, "{lower}-{}%", lower + BAND_WIDTH),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// A contiguous run of rendered items sharing a key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub key: GroupKey,
    pub start: usize,
    pub len: usize,
}

/// Calendar day of a UNIX timestamp in `tz`
#[must_use]
pub fn day_of<Tz: TimeZone>(timestamp: f64, tz: &Tz) -> Option<NaiveDate> {
    if !timestamp.is_finite() {
        return None;
    }
    let secs = timestamp.floor();
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let nanos = ((timestamp - secs) * 1e9) as u32;
    #[allow(clippy::cast_possible_truncation)]
    let utc = DateTime::from_timestamp(secs as i64, nanos)?;
    Some(utc.with_timezone(tz).date_naive())
}

/// Lower bound, in percent, of the band containing `score`
#[must_use]
pub fn band_of(score: f64) -> u8 {
    let score = score.clamp(0.0, 1.0);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let band = ((score * 20.0).floor() as u8).min(19);
    band * BAND_WIDTH
}

fn key_for<Tz: TimeZone>(item: &MediaItem, mode: SearchMode, tz: &Tz) -> GroupKey {
    match mode {
        SearchMode::TagFilter => day_of(item.timestamp, tz).map_or(GroupKey::Unknown, GroupKey::Day),
        SearchMode::Prompt => item
            .score
            .map_or(GroupKey::Unknown, |score| GroupKey::Band { lower: band_of(score) }),
    }
}

/// Splits `rendered` into groups for `mode`
#[must_use]
pub fn group_items<Tz: TimeZone>(rendered: &[MediaItem], mode: SearchMode, tz: &Tz) -> Vec<Group> {
    let mut groups: Vec<Group> = Vec::new();
    for (index, item) in rendered.iter().enumerate() {
        let key = key_for(item, mode, tz);
        match groups.last_mut() {
            Some(group) if group.key == key => group.len += 1,
            _ => groups.push(Group {
                key,
                start: index,
                len: 1,
            }),
        }
    }
    groups
}
