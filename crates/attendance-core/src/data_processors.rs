use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use tracing::warn;

// ── TimestampProcessor ────────────────────────────────────────────────────────

/// Parses timestamps from the variety of shapes found in exported
/// attendance documents.
pub struct TimestampProcessor;

impl TimestampProcessor {
    /// Attempt to parse a [`serde_json::Value`] into a UTC [`DateTime`].
    ///
    /// Handles:
    /// * `null`       → `None`
    /// * JSON string  → ISO 8601 / RFC 3339 (including `Z`-suffix), a bare
    ///   `YYYY-MM-DD` date, or common date-time patterns.
    /// * JSON number  → Unix timestamp (integer or float seconds).
    /// * JSON object  → document-store timestamp `{seconds, nanoseconds}`
    ///   (also accepted with leading underscores).
    pub fn parse(value: &Value) -> Option<DateTime<Utc>> {
        match value {
            Value::Null => None,
            Value::String(s) => Self::parse_str(s.as_str()),
            Value::Number(n) => {
                if let Some(secs) = n.as_i64() {
                    DateTime::from_timestamp(secs, 0)
                } else if let Some(f) = n.as_f64() {
                    let secs = f.trunc() as i64;
                    let nanos = (f.fract() * 1_000_000_000.0).round() as u32;
                    DateTime::from_timestamp(secs, nanos)
                } else {
                    None
                }
            }
            Value::Object(map) => {
                let secs = map
                    .get("seconds")
                    .or_else(|| map.get("_seconds"))
                    .and_then(Value::as_i64)?;
                let nanos = map
                    .get("nanoseconds")
                    .or_else(|| map.get("_nanoseconds"))
                    .and_then(Value::as_u64)
                    .unwrap_or(0);
                DateTime::from_timestamp(secs, u32::try_from(nanos).ok()?)
            }
            _ => None,
        }
    }

    /// Parse a timestamp string. Naive values are taken as UTC.
    pub fn parse_str(s: &str) -> Option<DateTime<Utc>> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }

        let normalised = if let Some(stripped) = s.strip_suffix('Z') {
            format!("{}+00:00", stripped)
        } else {
            s.to_string()
        };

        if let Ok(dt) = DateTime::parse_from_rfc3339(&normalised) {
            return Some(dt.with_timezone(&Utc));
        }

        if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
            return Some(dt.with_timezone(&Utc));
        }

        const FORMATS: &[&str] = &[
            "%Y-%m-%dT%H:%M:%S%.f",
            "%Y-%m-%dT%H:%M:%S",
            "%Y-%m-%d %H:%M:%S%.f",
            "%Y-%m-%d %H:%M:%S",
            "%Y-%m-%d",
            "%d/%m/%Y %H:%M:%S",
            "%m/%d/%Y %H:%M:%S",
        ];

        for fmt in FORMATS {
            if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, fmt) {
                return Some(Utc.from_utc_datetime(&naive));
            }
            if let Ok(date) = chrono::NaiveDate::parse_from_str(s, fmt) {
                let naive = date.and_hms_opt(0, 0, 0)?;
                return Some(Utc.from_utc_datetime(&naive));
            }
        }

        warn!(
            "TimestampProcessor: could not parse timestamp string \"{}\"",
            s
        );
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_rfc3339_z() {
        let ts = TimestampProcessor::parse(&json!("2024-08-01T09:30:00Z")).unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 8, 1, 9, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_rfc3339_offset() {
        let ts = TimestampProcessor::parse(&json!("2024-08-01T15:00:00+05:30")).unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 8, 1, 9, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_date_only() {
        let ts = TimestampProcessor::parse(&json!("2024-08-01")).unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 8, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_unix_integer() {
        let ts = TimestampProcessor::parse(&json!(1_722_504_600)).unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 8, 1, 9, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_store_timestamp_object() {
        let ts =
            TimestampProcessor::parse(&json!({"seconds": 1_722_504_600, "nanoseconds": 0}))
                .unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 8, 1, 9, 30, 0).unwrap());

        let underscored =
            TimestampProcessor::parse(&json!({"_seconds": 1_722_504_600, "_nanoseconds": 5}));
        assert!(underscored.is_some());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(TimestampProcessor::parse(&json!("yesterday-ish")).is_none());
        assert!(TimestampProcessor::parse(&json!("")).is_none());
        assert!(TimestampProcessor::parse(&json!(null)).is_none());
        assert!(TimestampProcessor::parse(&json!(true)).is_none());
        assert!(TimestampProcessor::parse(&json!({"nanoseconds": 1})).is_none());
    }
}
