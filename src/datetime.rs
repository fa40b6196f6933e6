//! GPX timestamp parsing and formatting.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Output pattern: `yyyy-MM-ddTHH:mm:ss.fffZ`, always UTC.
const GPX_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Parse a GPX `time` value, normalizing any offset to UTC.
///
/// Accepts RFC 3339 (`2025-01-01T06:00:00Z`, `2025-01-01T08:00:00+02:00`)
/// and offset-less `2025-01-01T06:00:00[.fff]`, which is taken as UTC.
/// Anything else yields `None`.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Format a timestamp for output with millisecond precision.
pub fn format_timestamp(time: &DateTime<Utc>) -> String {
    time.format(GPX_TIME_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn test_parse_utc() {
        let t = parse_timestamp("2025-01-01T06:00:00Z").unwrap();
        assert_eq!(t, Utc.with_ymd_and_hms(2025, 1, 1, 6, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_offset_normalized() {
        let t = parse_timestamp("2025-01-01T08:30:00+02:00").unwrap();
        assert_eq!(t, Utc.with_ymd_and_hms(2025, 1, 1, 6, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_naive_as_utc() {
        let t = parse_timestamp(" 2025-01-01T06:00:00.250 ").unwrap();
        assert_eq!(t.hour(), 6);
        assert_eq!(t.nanosecond(), 250_000_000);
    }

    #[test]
    fn test_parse_garbage() {
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("").is_none());
    }

    #[test]
    fn test_format_pads_milliseconds() {
        let t = Utc.with_ymd_and_hms(2025, 3, 9, 7, 5, 2).unwrap();
        assert_eq!(format_timestamp(&t), "2025-03-09T07:05:02.000Z");

        let t = parse_timestamp("2025-03-09T07:05:02.123456Z").unwrap();
        assert_eq!(format_timestamp(&t), "2025-03-09T07:05:02.123Z");
    }
}
