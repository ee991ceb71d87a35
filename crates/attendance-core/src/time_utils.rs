use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{AttendanceError, Result};

// ── Timezones ─────────────────────────────────────────────────────────────────

/// Detect the IANA timezone name of the running system.
///
/// Falls back to `"UTC"` if detection fails.
pub fn get_system_timezone() -> String {
    iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string())
}

/// Resolve an IANA timezone name, falling back to UTC with a warning.
pub fn resolve_timezone(name: &str) -> Tz {
    name.parse::<Tz>().unwrap_or_else(|_| {
        warn!("unrecognised timezone \"{}\", falling back to UTC", name);
        Tz::UTC
    })
}

/// Calendar date of `ts` as seen in `tz`.
pub fn local_date(ts: DateTime<Utc>, tz: Tz) -> NaiveDate {
    ts.with_timezone(&tz).date_naive()
}

/// First instant of `date` in `tz`, expressed in UTC.
///
/// On a DST gap the earliest valid instant after midnight is used.
pub fn start_of_day(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    let naive = date.and_time(NaiveTime::MIN);
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
        LocalResult::None => {
            let shifted = naive + Duration::hours(1);
            tz.from_local_datetime(&shifted)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
        }
    }
}

/// Last representable instant of `date` in `tz` (the millisecond before the
/// next day starts), expressed in UTC.
pub fn end_of_day(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    let next = date.succ_opt().unwrap_or(date);
    start_of_day(next, tz) - Duration::milliseconds(1)
}

/// Parse a `YYYY-MM-DD` command-line date.
pub fn parse_date_arg(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| AttendanceError::InvalidDate(s.to_string()))
}

// ── DateWindow ────────────────────────────────────────────────────────────────

/// Inclusive time window. Either bound may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DateWindow {
    /// A window with no bounds: every dated session falls inside it.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Window covering whole calendar days from `start` to `end` in `tz`.
    ///
    /// Returns [`AttendanceError::InvalidDate`] when `start` is after `end`.
    pub fn from_dates(start: Option<NaiveDate>, end: Option<NaiveDate>, tz: Tz) -> Result<Self> {
        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                return Err(AttendanceError::InvalidDate(format!(
                    "start date {s} is after end date {e}"
                )));
            }
        }
        Ok(Self {
            start: start.map(|d| start_of_day(d, tz)),
            end: end.map(|d| end_of_day(d, tz)),
        })
    }

    /// The `days` days up to and including `now`.
    pub fn lookback(now: DateTime<Utc>, days: u32) -> Self {
        Self {
            start: Some(now - Duration::days(i64::from(days))),
            end: Some(now),
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Whether `ts` falls inside the window. Undated instants never do.
    pub fn contains(&self, ts: Option<DateTime<Utc>>) -> bool {
        let Some(ts) = ts else {
            return false;
        };
        self.start.map_or(true, |s| ts >= s) && self.end.map_or(true, |e| ts <= e)
    }
}

// ── Trend periods ─────────────────────────────────────────────────────────────

/// A labelled window used to bucket sessions for trends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Period {
    pub label: String,
    pub window: DateWindow,
}

/// The `count` calendar months ending with the month containing `now`,
/// oldest first. Labels look like `"Aug 2024"`.
pub fn trailing_months(now: DateTime<Utc>, count: u32, tz: Tz) -> Vec<Period> {
    let today = local_date(now, tz);
    let mut periods = Vec::with_capacity(count as usize);

    for back in (0..count).rev() {
        let Some(first) = first_of_month_back(today, back) else {
            continue;
        };
        let last = first
            .checked_add_months(chrono::Months::new(1))
            .and_then(|next| next.pred_opt())
            .unwrap_or(first);
        periods.push(Period {
            label: first.format("%b %Y").to_string(),
            window: DateWindow {
                start: Some(start_of_day(first, tz)),
                end: Some(end_of_day(last, tz)),
            },
        });
    }
    periods
}

/// The `count` consecutive 7-day windows ending at `now`, oldest first.
/// Labels look like `"Week of 2024-08-01"`.
pub fn trailing_weeks(now: DateTime<Utc>, count: u32, tz: Tz) -> Vec<Period> {
    (0..count)
        .rev()
        .map(|back| {
            let end = now - Duration::days(7 * i64::from(back));
            let start = end - Duration::days(7);
            Period {
                label: format!("Week of {}", local_date(start, tz).format("%Y-%m-%d")),
                // Adjacent weeks share a boundary instant; nudge the start so
                // a session is never counted twice.
                window: DateWindow {
                    start: Some(start + Duration::milliseconds(1)),
                    end: Some(end),
                },
            }
        })
        .collect()
}

fn first_of_month_back(date: NaiveDate, months_back: u32) -> Option<NaiveDate> {
    date.with_day(1)?
        .checked_sub_months(chrono::Months::new(months_back))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
