use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Render a timestamp the way browser-side collaborators write them
/// (`2024-01-15T10:30:00.000Z`).
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Leniently parse a creation time written by an external collaborator.
///
/// Accepts RFC 3339, naive `YYYY-MM-DDTHH:MM:SS[.fff]` (taken as UTC), a bare
/// `YYYY-MM-DD`, or integer epoch milliseconds. Anything else is `None`.
pub fn parse_timestamp(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }
    if input.chars().all(|c| c.is_ascii_digit()) {
        return input.parse::<i64>().ok().and_then(from_epoch_millis);
    }
    None
}

/// Interpret an integer as milliseconds since the Unix epoch.
pub fn from_epoch_millis(millis: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single()
}

/// A creation time as another tool stored it: usually an ISO string, sometimes
/// a bare `Date.now()` number. The raw value is kept so records are written
/// back the way they were read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordedTime {
    Text(String),
    Millis(i64),
    Other(Value),
}

impl RecordedTime {
    pub fn parse(&self) -> Option<DateTime<Utc>> {
        match self {
            RecordedTime::Text(text) => parse_timestamp(text),
            RecordedTime::Millis(millis) => from_epoch_millis(*millis),
            RecordedTime::Other(value) => value
                .as_f64()
                .filter(|millis| millis.is_finite())
                .and_then(|millis| from_epoch_millis(millis as i64)),
        }
    }
}

impl From<DateTime<Utc>> for RecordedTime {
    fn from(at: DateTime<Utc>) -> Self {
        RecordedTime::Text(format_timestamp(at))
    }
}

impl From<&str> for RecordedTime {
    fn from(text: &str) -> Self {
        RecordedTime::Text(text.to_string())
    }
}

impl std::fmt::Display for RecordedTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordedTime::Text(text) => f.pad(text),
            RecordedTime::Millis(millis) => f.pad(&millis.to_string()),
            RecordedTime::Other(value) => f.pad(&value.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_matches_browser_iso_strings() {
        let at = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        assert_eq!(format_timestamp(at), "2024-01-15T10:30:00.000Z");
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2024-01-15T10:30:00.000Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-15T12:30:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-15T10:30:00"), Some(expected));
        assert_eq!(
            parse_timestamp(&expected.timestamp_millis().to_string()),
            Some(expected)
        );
        assert_eq!(
            parse_timestamp("2024-01-15"),
            Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).single()
        );
    }

    #[test]
    fn test_recorded_time_accepts_numbers() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();

        let millis: RecordedTime = serde_json::from_str("1705314600000").unwrap();
        assert_eq!(millis, RecordedTime::Millis(1705314600000));
        assert_eq!(millis.parse(), Some(expected));
        assert_eq!(serde_json::to_string(&millis).unwrap(), "1705314600000");

        let fractional: RecordedTime = serde_json::from_str("1705314600000.5").unwrap();
        assert_eq!(fractional.parse(), Some(expected));

        let text: RecordedTime = serde_json::from_str("\"2024-01-15T10:30:00.000Z\"").unwrap();
        assert_eq!(text, RecordedTime::from("2024-01-15T10:30:00.000Z"));
        assert_eq!(text.parse(), Some(expected));

        let odd: RecordedTime = serde_json::from_str("{\"seconds\": 1}").unwrap();
        assert_eq!(odd.parse(), None);
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp("2024-13-45"), None);
    }
}
