//! Date/time helpers for LANSHARE.
//!
//! Timestamps are stored as fixed-width UTC strings
//! (`2024-01-15T10:30:00.000000Z`). Every stored value has the same shape, so
//! SQLite's text comparison orders them chronologically and expiry queries
//! can compare `expires_at <= ?` directly.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Storage format for all timestamps.
pub const DB_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// Format a UTC datetime for storage.
pub fn to_db_timestamp(dt: &DateTime<Utc>) -> String {
    dt.format(DB_TIMESTAMP_FORMAT).to_string()
}

/// Parse a stored timestamp.
///
/// Accepts the storage format and, for hand-edited rows, any RFC 3339 string.
pub fn parse_db_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, DB_TIMESTAMP_FORMAT) {
        return Some(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_to_db_timestamp() {
        let dt = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        assert_eq!(to_db_timestamp(&dt), "2024-01-15T10:30:00.000000Z");
    }

    #[test]
    fn test_parse_round_trip() {
        let dt = Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap()
            + Duration::microseconds(123_456);
        let parsed = parse_db_timestamp(&to_db_timestamp(&dt)).unwrap();
        assert_eq!(parsed, dt);
    }

    #[test]
    fn test_parse_rfc3339_fallback() {
        let parsed = parse_db_timestamp("2024-01-15T19:30:00+09:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse_db_timestamp("not a date").is_none());
    }

    #[test]
    fn test_text_order_matches_time_order() {
        let early = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        let late = early + Duration::milliseconds(1);
        let much_later = early + Duration::days(400);

        assert!(to_db_timestamp(&early) < to_db_timestamp(&late));
        assert!(to_db_timestamp(&late) < to_db_timestamp(&much_later));
    }
}
