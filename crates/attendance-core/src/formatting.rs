use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// Display style for [`format_date`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateStyle {
    /// `"Aug 1, 2024"`
    Short,
    /// `"Thursday, August 1, 2024"`
    Long,
    /// `"Aug 1, 2024 09:30 AM"`
    DateTime,
    /// `"2024-08-01"`
    Iso,
}

/// Format `ts` in `tz` using `style`.
///
/// # Examples
///
/// ```
/// use attendance_core::formatting::{format_date, DateStyle};
/// use chrono::{TimeZone, Utc};
///
/// let ts = Utc.with_ymd_and_hms(2024, 8, 1, 9, 30, 0).unwrap();
/// assert_eq!(format_date(ts, chrono_tz::Tz::UTC, DateStyle::Short), "Aug 1, 2024");
/// assert_eq!(format_date(ts, chrono_tz::Tz::UTC, DateStyle::Iso), "2024-08-01");
/// ```
pub fn format_date(ts: DateTime<Utc>, tz: Tz, style: DateStyle) -> String {
    let local = ts.with_timezone(&tz);
    match style {
        DateStyle::Short => local.format("%b %-d, %Y").to_string(),
        DateStyle::Long => local.format("%A, %B %-d, %Y").to_string(),
        DateStyle::DateTime => local.format("%b %-d, %Y %I:%M %p").to_string(),
        DateStyle::Iso => local.format("%Y-%m-%d").to_string(),
    }
}

/// Like [`format_date`] but renders a missing date as `"-"`.
pub fn format_optional_date(ts: Option<DateTime<Utc>>, tz: Tz, style: DateStyle) -> String {
    ts.map_or_else(|| "-".to_string(), |ts| format_date(ts, tz, style))
}

/// `"67%"`
pub fn format_percentage(percentage: u32) -> String {
    format!("{percentage}%")
}

/// Format a count with thousands separators.
///
/// # Examples
///
/// ```
/// use attendance_core::formatting::format_count;
///
/// assert_eq!(format_count(0), "0");
/// assert_eq!(format_count(1_234_567), "1,234,567");
/// ```
pub fn format_count(value: u64) -> String {
    group_thousands(&value.to_string())
}

/// Format a session length in minutes: `"45m"`, `"1h"`, `"1h 30m"`.
pub fn format_duration(minutes: u32) -> String {
    if minutes < 60 {
        format!("{}m", minutes)
    } else {
        let hours = minutes / 60;
        let mins = minutes % 60;
        if mins == 0 {
            format!("{}h", hours)
        } else {
            format!("{}h {}m", hours, mins)
        }
    }
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Insert commas every three digits from the right of an integer string.
fn group_thousands(s: &str) -> String {
    if s.len() <= 3 {
        return s.to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    let remainder = chars.len() % 3;
    for (i, &c) in chars.iter().enumerate() {
        if i != 0 && (i % 3 == remainder) {
            result.push(',');
        }
        result.push(c);
    }
    result
}

// ── Tests ──────────────────────────────────────────────────────────────────────
