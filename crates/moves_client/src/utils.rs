//! Day-key and timestamp helpers for the storyline format.

use chrono::{DateTime, FixedOffset, NaiveDate};

/// Format of the day keys used in URLs and `Day::date`.
pub const DAY_KEY_FORMAT: &str = "%Y%m%d";

/// Parse a storyline timestamp (`YYYYMMDDTHHmmssZ`).
///
/// Accepts:
/// - `20140305T081500+0100` (numeric offset)
/// - `20140305T081500Z` (UTC)
pub fn parse_moves_time(s: &str) -> Option<DateTime<FixedOffset>> {
    let s = s.trim();
    if let Some(utc) = s.strip_suffix('Z') {
        return DateTime::parse_from_str(&format!("{utc}+0000"), "%Y%m%dT%H%M%S%z").ok();
    }
    DateTime::parse_from_str(s, "%Y%m%dT%H%M%S%z").ok()
}

pub fn parse_day_key(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DAY_KEY_FORMAT).ok()
}

pub fn day_key(date: NaiveDate) -> String {
    date.format(DAY_KEY_FORMAT).to_string()
}
