// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Timestamp helpers for stored RFC3339 strings.

use chrono::{DateTime, SecondsFormat, Utc};

/// Format a UTC timestamp as RFC3339 with whole seconds and a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse a stored RFC3339 timestamp in any offset.
pub fn parse_utc_rfc3339(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_normalizes_offset() {
        let parsed = parse_utc_rfc3339("2026-03-01T10:00:00+02:00").unwrap();
        assert_eq!(format_utc_rfc3339(parsed), "2026-03-01T08:00:00Z");
        assert_eq!(parse_utc_rfc3339("yesterday"), None);
    }

    #[test]
    fn test_format_drops_subseconds() {
        let date = Utc.timestamp_millis_opt(1_767_225_600_123).unwrap();
        assert_eq!(format_utc_rfc3339(date), "2026-01-01T00:00:00Z");
    }
}
