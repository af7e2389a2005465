/// Lenient timestamp handling for state files written by older runs and external tools
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use tracing::debug;

/// Formats tried after RFC 3339, in order
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%b %d, %Y",
    "%d %b %Y",
];

/// Current local wall-clock time, the reference point for every age check
pub fn now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

/// Render a timestamp the way state files store it
pub fn format_iso(dt: &NaiveDateTime) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

/// Parse a date string in any of the supported layouts.
///
/// Timezone suffixes are dropped and the wall-clock time is kept, so
/// `2025-03-01T10:00:00Z` and `2025-03-01T10:00:00` compare equal.
pub fn parse_date(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_local());
    }

    let stripped = strip_timezone(trimmed);

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(stripped, fmt) {
            return Some(dt);
        }
    }

    // Compact upload dates (YYYYMMDD) as emitted by the search tool
    if stripped.len() == 8 && stripped.bytes().all(|b| b.is_ascii_digit()) {
        let year = stripped[0..4].parse().ok()?;
        let month = stripped[4..6].parse().ok()?;
        let day = stripped[6..8].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day).and_then(|d| d.and_hms_opt(0, 0, 0));
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(stripped, fmt) {
            return date.and_hms_opt(0, 0, 0);
        }
    }

    if let Some(dt) = parse_spreadsheet_serial(stripped) {
        return Some(dt);
    }

    debug!("Could not parse date: {}", raw);
    None
}

fn strip_timezone(s: &str) -> &str {
    let s = s.split('+').next().unwrap_or(s);
    s.trim_end_matches('Z').trim()
}

/// Spreadsheet day serials count from 1899-12-30, which already absorbs the
/// phantom 1900-02-29
fn parse_spreadsheet_serial(s: &str) -> Option<NaiveDateTime> {
    if s.matches('.').count() > 1 || !s.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }
    let days: f64 = s.parse().ok()?;
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (days * 86_400_000.0).round() as i64;
    base.checked_add_signed(Duration::milliseconds(millis))
}

/// True when `dt` lies strictly before `now - days`.
/// A cutoff beyond the representable range keeps everything.
pub fn is_older_than_days(dt: &NaiveDateTime, days: u32, now: &NaiveDateTime) -> bool {
    now.checked_sub_signed(Duration::days(i64::from(days)))
        .is_some_and(|cutoff| *dt < cutoff)
}

/// Whole calendar days from `from` to `to`
pub fn days_between(from: &NaiveDateTime, to: &NaiveDateTime) -> i64 {
    (to.date() - from.date()).num_days()
}

/// Serde adaptor for optional timestamps that tolerates any supported layout
pub mod lenient {
    use super::{format_iso, parse_date};
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(dt) => serializer.serialize_str(&format_iso(dt)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<serde_json::Value> = Option::deserialize(deserializer)?;
        Ok(raw.as_ref().and_then(|v| v.as_str()).and_then(parse_date))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd_hms(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, mi, s).unwrap()
    }

    #[test]
    fn test_parse_iso_variants() {
        let expected = ymd_hms(2025, 3, 1, 10, 30, 0);
        assert_eq!(parse_date("2025-03-01T10:30:00"), Some(expected));
        assert_eq!(parse_date("2025-03-01 10:30:00"), Some(expected));
        assert_eq!(parse_date("2025-03-01T10:30:00Z"), Some(expected));
        assert_eq!(parse_date("2025-03-01T10:30:00+05:00"), Some(expected));

        let with_fraction = parse_date("2025-03-01T10:30:00.123456").unwrap();
        assert_eq!(with_fraction.date(), expected.date());
    }

    #[test]
    fn test_parse_date_only_layouts() {
        let expected = ymd_hms(2024, 12, 25, 0, 0, 0);
        assert_eq!(parse_date("2024-12-25"), Some(expected));
        assert_eq!(parse_date("20241225"), Some(expected));
        assert_eq!(parse_date("12/25/2024"), Some(expected));
        assert_eq!(parse_date("Dec 25, 2024"), Some(expected));
        assert_eq!(parse_date("25 Dec 2024"), Some(expected));
    }

    #[test]
    fn test_parse_spreadsheet_serial() {
        // 45292 is 2024-01-01 in spreadsheet serial form
        let parsed = parse_date("45292").unwrap();
        assert_eq!(parsed.date(), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());

        let noon = parse_date("45292.5").unwrap();
        assert_eq!(noon, ymd_hms(2024, 1, 1, 12, 0, 0));
    }

    #[test]
    fn test_parse_garbage() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("   "), None);
        assert_eq!(parse_date("not a date"), None);
        assert_eq!(parse_date("1.2.3"), None);
    }

    #[test]
    fn test_age_helpers() {
        let now = ymd_hms(2025, 1, 10, 12, 0, 0);
        assert!(is_older_than_days(&ymd_hms(2025, 1, 1, 0, 0, 0), 7, &now));
        assert!(!is_older_than_days(&ymd_hms(2025, 1, 5, 0, 0, 0), 7, &now));
        assert_eq!(days_between(&ymd_hms(2025, 1, 1, 23, 0, 0), &now), 9);
    }

    #[test]
    fn test_age_window_past_date_range() {
        let now = ymd_hms(2025, 1, 10, 12, 0, 0);
        assert!(!is_older_than_days(&ymd_hms(1970, 1, 1, 0, 0, 0), u32::MAX, &now));
        assert!(!is_older_than_days(&NaiveDateTime::MIN, u32::MAX, &now));
    }

    #[test]
    fn test_format_round_trip() {
        let dt = ymd_hms(2025, 6, 15, 8, 5, 3);
        assert_eq!(parse_date(&format_iso(&dt)), Some(dt));
    }
}
