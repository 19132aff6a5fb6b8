//! Calendar-day and hour cache keys in a fixed time zone
//!
//! All partition keys are derived from UTC plus a fixed JST offset, never
//! from the host's local time zone, so a misconfigured host clock zone does
//! not shift cache partitions.

use chrono::{DateTime, FixedOffset, Utc};
use once_cell::sync::Lazy;

/// Fixed JST offset (UTC+9). News sources partition their archives by JST day.
static JST: Lazy<FixedOffset> =
    Lazy::new(|| FixedOffset::east_opt(9 * 3600).expect("JST offset is in range"));

/// Current 8-digit `YYYYMMDD` date key in JST.
pub fn today() -> String {
    date_key(Utc::now())
}

/// Current `YYYYMMDDHH` hour key in JST.
pub fn today_hour() -> String {
    hour_key(Utc::now())
}

/// Formats an instant as a `YYYYMMDD` date key in JST.
pub fn date_key(at: DateTime<Utc>) -> String {
    at.with_timezone(&*JST).format("%Y%m%d").to_string()
}

/// Formats an instant as a `YYYYMMDDHH` hour key in JST.
pub fn hour_key(at: DateTime<Utc>) -> String {
    at.with_timezone(&*JST).format("%Y%m%d%H").to_string()
}

/// Whether a cache key (date or hour granularity) denotes the current JST day.
///
/// Only the date portion of the key is compared, so an hour-stamped key for
/// today is still classified as current.
pub fn is_current_period(key: &str) -> bool {
    is_current_period_at(key, Utc::now())
}

fn is_current_period_at(key: &str, now: DateTime<Utc>) -> bool {
    key.get(..8) == Some(date_key(now).as_str())
}

/// Whether a path segment is a well-formed date key: exactly 8 ASCII digits.
pub fn is_valid_date_key(s: &str) -> bool {
    s.len() == 8 && s.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_date_key_is_jst_not_utc() {
        // 2024-01-01 20:00 UTC is already 2024-01-02 05:00 in JST
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 20, 0, 0).unwrap();
        assert_eq!(date_key(at), "20240102");
        assert_eq!(hour_key(at), "2024010205");
    }

    #[test]
    fn test_date_key_zero_padding() {
        let at = Utc.with_ymd_and_hms(2024, 3, 4, 1, 5, 0).unwrap();
        assert_eq!(date_key(at), "20240304");
        assert_eq!(hour_key(at), "2024030410");
    }

    #[test]
    fn test_current_period_matches_hour_keys_by_date_prefix() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 3, 0, 0).unwrap();
        // JST date is 20240601
        assert!(is_current_period_at("20240601", now));
        assert!(is_current_period_at("2024060112", now));
        assert!(!is_current_period_at("20240531", now));
        assert!(!is_current_period_at("2024053123", now));
        assert!(!is_current_period_at("abc", now));
    }

    #[test]
    fn test_valid_date_key() {
        assert!(is_valid_date_key("20240101"));
        assert!(!is_valid_date_key("2024010"));
        assert!(!is_valid_date_key("202401011"));
        assert!(!is_valid_date_key("2024010a"));
        assert!(!is_valid_date_key("abc"));
        assert!(!is_valid_date_key(""));
    }
}
