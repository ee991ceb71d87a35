//! Per-student and per-period attendance aggregation.

use std::collections::BTreeMap;

use attendance_core::calculations::{attendance_percentage, ratio_percentage, Tally};
use attendance_core::models::{AttendanceSession, AttendanceStats, AttendanceStatus};
use attendance_core::time_utils::Period;
use serde::Serialize;

// ── StatsAccumulator ──────────────────────────────────────────────────────────

/// Running status counts for one student.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct StatsAccumulator {
    present: u32,
    absent: u32,
    late: u32,
}

impl StatsAccumulator {
    fn add(&mut self, status: AttendanceStatus) {
        match status {
            AttendanceStatus::Present => self.present += 1,
            AttendanceStatus::Absent => self.absent += 1,
            AttendanceStatus::Late => self.late += 1,
        }
    }

    fn finish(self) -> AttendanceStats {
        let total = self.present + self.absent + self.late;
        AttendanceStats {
            total_sessions: total,
            present_sessions: self.present,
            absent_sessions: self.absent,
            late_sessions: self.late,
            attendance_percentage: attendance_percentage(self.present, self.late, total),
        }
    }
}

// ── PeriodStats ───────────────────────────────────────────────────────────────

/// Sessions and student-slot attendance within one trend period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodStats {
    pub label: String,
    pub sessions: u32,
    pub attended: u32,
    pub student_slots: u32,
    /// Session-weighted: attended slots over all slots.
    pub attendance_percentage: u32,
}

impl Tally for PeriodStats {
    fn attended(&self) -> u32 {
        self.attended
    }

    fn total(&self) -> u32 {
        self.student_slots
    }
}

// ── AttendanceAggregator ──────────────────────────────────────────────────────

/// Stateless helper that reduces attendance sessions to statistics.
///
/// Every function is a commutative reduction: session order never affects
/// the result.
pub struct AttendanceAggregator;

impl AttendanceAggregator {
    /// Statistics for `student_id` over `sessions`.
    ///
    /// A session with no record for the student does not count toward their
    /// total, so a student enrolled after a session was taken is not penalised.
    pub fn student_stats<'a, I>(sessions: I, student_id: &str) -> AttendanceStats
    where
        I: IntoIterator<Item = &'a AttendanceSession>,
    {
        let mut acc = StatsAccumulator::default();
        for session in sessions {
            if let Some(record) = session.record_for(student_id) {
                acc.add(record.status);
            }
        }
        acc.finish()
    }

    /// Statistics for every student with at least one record in `sessions`,
    /// keyed by student id.
    pub fn stats_by_student<'a, I>(sessions: I) -> BTreeMap<String, AttendanceStats>
    where
        I: IntoIterator<Item = &'a AttendanceSession>,
    {
        let mut map: BTreeMap<String, StatsAccumulator> = BTreeMap::new();
        for session in sessions {
            for record in session.records() {
                map.entry(record.student_id.clone())
                    .or_default()
                    .add(record.status);
            }
        }
        map.into_iter().map(|(id, acc)| (id, acc.finish())).collect()
    }

    /// Sum several stats into one, recomputing the percentage from the sums.
    pub fn combine<'a, I>(stats: I) -> AttendanceStats
    where
        I: IntoIterator<Item = &'a AttendanceStats>,
    {
        let acc = stats
            .into_iter()
            .fold(StatsAccumulator::default(), |acc, s| StatsAccumulator {
                present: acc.present + s.present_sessions,
                absent: acc.absent + s.absent_sessions,
                late: acc.late + s.late_sessions,
            });
        acc.finish()
    }

    /// Bucket `sessions` into `periods`. Sessions outside every period, or
    /// without a date, are ignored.
    ///
    /// Returns one entry per period, in the order given.
    pub fn aggregate_by_period(
        sessions: &[AttendanceSession],
        periods: &[Period],
    ) -> Vec<PeriodStats> {
        periods
            .iter()
            .map(|period| {
                let mut count = 0u32;
                let mut attended = 0u32;
                let mut slots = 0u32;
                for session in sessions.iter().filter(|s| period.window.contains(s.date)) {
                    count += 1;
                    attended += session.attended();
                    slots += session.total();
                }
                PeriodStats {
                    label: period.label.clone(),
                    sessions: count,
                    attended,
                    student_slots: slots,
                    attendance_percentage: ratio_percentage(
                        u64::from(attended),
                        u64::from(slots),
                    ),
                }
            })
            .collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use attendance_core::models::{AttendanceRecord, SessionHeader};
    use attendance_core::time_utils::DateWindow;
    use chrono::{DateTime, TimeZone, Utc};

    use attendance_core::models::AttendanceStatus::{Absent, Late, Present};

    fn ts(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 8, day, 9, 0, 0).unwrap()
    }

    fn make_session(
        id: &str,
        day: Option<u32>,
        records: &[(&str, AttendanceStatus)],
    ) -> AttendanceSession {
        AttendanceSession::new(
            SessionHeader {
                id: id.to_string(),
                class_id: "c1".to_string(),
                faculty_id: "f1".to_string(),
                date: day.map(ts),
                session_number: 1,
                topic: String::new(),
                duration_minutes: 60,
            },
            records
                .iter()
                .map(|(sid, status)| AttendanceRecord {
                    student_id: sid.to_string(),
                    student_name: String::new(),
                    status: *status,
                    remarks: None,
                })
                .collect(),
        )
    }

    // ── student_stats ─────────────────────────────────────────────────────────

    #[test]
    fn test_present_late_absent_gives_67() {
        let sessions = vec![
            make_session("a1", Some(1), &[("s", Present)]),
            make_session("a2", Some(2), &[("s", Late)]),
            make_session("a3", Some(3), &[("s", Absent)]),
        ];
        let stats = AttendanceAggregator::student_stats(&sessions, "s");

        assert_eq!(stats.total_sessions, 3);
        assert_eq!(stats.present_sessions, 1);
        assert_eq!(stats.late_sessions, 1);
        assert_eq!(stats.absent_sessions, 1);
        assert_eq!(stats.attendance_percentage, 67);
    }

    #[test]
    fn test_empty_sessions_yield_zero() {
        let stats = AttendanceAggregator::student_stats(std::iter::empty(), "s");
        assert_eq!(stats, AttendanceStats::default());
    }

    #[test]
    fn test_session_without_record_not_counted() {
        let sessions = vec![
            make_session("a1", Some(1), &[("other", Present)]),
            make_session("a2", Some(2), &[("s", Present), ("other", Absent)]),
        ];
        let stats = AttendanceAggregator::student_stats(&sessions, "s");
        assert_eq!(stats.total_sessions, 1);
        assert_eq!(stats.attendance_percentage, 100);
    }

    #[test]
    fn test_never_enrolled_student_is_zero_not_error() {
        let sessions = vec![make_session("a1", Some(1), &[("other", Present)])];
        let stats = AttendanceAggregator::student_stats(&sessions, "ghost");
        assert_eq!(stats.total_sessions, 0);
        assert_eq!(stats.attendance_percentage, 0);
    }

    #[test]
    fn test_counts_sum_to_total_and_order_irrelevant() {
        let mut sessions = vec![
            make_session("a1", Some(1), &[("s", Present)]),
            make_session("a2", Some(2), &[("s", Absent)]),
            make_session("a3", Some(3), &[("s", Late)]),
            make_session("a4", Some(4), &[("s", Present)]),
        ];
        let forward = AttendanceAggregator::student_stats(&sessions, "s");
        sessions.reverse();
        let backward = AttendanceAggregator::student_stats(&sessions, "s");

        assert_eq!(forward, backward);
        assert_eq!(
            forward.present_sessions + forward.absent_sessions + forward.late_sessions,
            forward.total_sessions
        );
        assert_eq!(
            AttendanceAggregator::student_stats(&sessions, "s"),
            forward,
            "repeated calls must agree"
        );
    }

    // ── stats_by_student ──────────────────────────────────────────────────────

    #[test]
    fn test_stats_by_student_matches_student_stats() {
        let sessions = vec![
            make_session("a1", Some(1), &[("s1", Present), ("s2", Absent)]),
            make_session("a2", Some(2), &[("s1", Late)]),
        ];
        let map = AttendanceAggregator::stats_by_student(&sessions);

        assert_eq!(map.len(), 2);
        assert_eq!(map["s1"], AttendanceAggregator::student_stats(&sessions, "s1"));
        assert_eq!(map["s2"].attendance_percentage, 0);
    }

    // ── combine ───────────────────────────────────────────────────────────────

    #[test]
    fn test_combine_recomputes_from_sums() {
        let a = AttendanceStats {
            total_sessions: 1,
            present_sessions: 1,
            absent_sessions: 0,
            late_sessions: 0,
            attendance_percentage: 100,
        };
        let b = AttendanceStats {
            total_sessions: 3,
            present_sessions: 0,
            absent_sessions: 3,
            late_sessions: 0,
            attendance_percentage: 0,
        };
        // 1 of 4, not mean(100, 0)
        assert_eq!(AttendanceAggregator::combine(&[a, b]).attendance_percentage, 25);
        assert_eq!(
            AttendanceAggregator::combine(std::iter::empty()),
            AttendanceStats::default()
        );
    }

    // ── aggregate_by_period ───────────────────────────────────────────────────

    #[test]
    fn test_aggregate_by_period_buckets_and_skips_undated() {
        let sessions = vec![
            make_session("a1", Some(1), &[("s1", Present), ("s2", Absent)]),
            make_session("a2", Some(10), &[("s1", Present), ("s2", Present)]),
            make_session("a3", None, &[("s1", Present)]),
        ];
        let periods = vec![
            Period {
                label: "early".to_string(),
                window: DateWindow {
                    start: Some(ts(1)),
                    end: Some(ts(5)),
                },
            },
            Period {
                label: "late".to_string(),
                window: DateWindow {
                    start: Some(ts(6)),
                    end: Some(ts(20)),
                },
            },
            Period {
                label: "empty".to_string(),
                window: DateWindow {
                    start: Some(ts(21)),
                    end: Some(ts(30)),
                },
            },
        ];

        let stats = AttendanceAggregator::aggregate_by_period(&sessions, &periods);
        assert_eq!(stats.len(), 3);
        assert_eq!(stats[0].sessions, 1);
        assert_eq!(stats[0].attendance_percentage, 50);
        assert_eq!(stats[1].sessions, 1);
        assert_eq!(stats[1].attendance_percentage, 100);
        assert_eq!(stats[2].sessions, 0);
        assert_eq!(stats[2].attendance_percentage, 0);
        assert_eq!(stats[2].percentage(), 0);
    }
}
