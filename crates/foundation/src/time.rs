use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};

/// Instants are always carried in UTC.
pub type Timestamp = DateTime<Utc>;

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
];

/// Unix epoch, the "no recency limit" threshold.
pub fn epoch() -> Timestamp {
    DateTime::<Utc>::UNIX_EPOCH
}

/// Parses an RFC 3339 instant, a zone-less date-time (read as UTC) or a bare
/// `YYYY-MM-DD` date (UTC midnight).
pub fn parse_timestamp(raw: &str) -> Option<Timestamp> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN).and_utc())
}

/// Compact text form: `YYYY-MM-DD` for UTC midnight, RFC 3339 with `Z` otherwise.
///
/// Always accepted by [`parse_timestamp`] and parses back to the same instant.
pub fn format_timestamp(ts: Timestamp) -> String {
    if ts.time() == NaiveTime::MIN {
        ts.date_naive().format("%Y-%m-%d").to_string()
    } else {
        ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }
}

pub fn from_unix_millis(ms: i64) -> Option<Timestamp> {
    DateTime::<Utc>::from_timestamp_millis(ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_supported_shapes() {
        let midnight = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2024-03-01"), Some(midnight));
        assert_eq!(parse_timestamp("2024-03-01T00:00:00Z"), Some(midnight));
        assert_eq!(parse_timestamp("2024-03-01T02:00:00+02:00"), Some(midnight));
        assert_eq!(parse_timestamp("2024-03-01T00:00:00.000"), Some(midnight));
        assert_eq!(parse_timestamp("2024-03-01 00:00:00"), Some(midnight));
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp(""), None);
    }

    #[test]
    fn format_is_compact_and_reversible() {
        let midnight = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        assert_eq!(format_timestamp(midnight), "2024-03-01");

        let afternoon = Utc.with_ymd_and_hms(2024, 3, 1, 15, 4, 5).unwrap();
        assert_eq!(format_timestamp(afternoon), "2024-03-01T15:04:05Z");
        assert_eq!(parse_timestamp(&format_timestamp(afternoon)), Some(afternoon));

        let precise = from_unix_millis(1_709_305_445_123).unwrap();
        assert_eq!(parse_timestamp(&format_timestamp(precise)), Some(precise));
    }

    #[test]
    fn epoch_is_unix_zero() {
        assert_eq!(epoch().timestamp(), 0);
        assert_eq!(format_timestamp(epoch()), "1970-01-01");
    }
}
