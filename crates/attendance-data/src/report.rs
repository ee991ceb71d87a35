//! Class, student, faculty and admin reports.
//!
//! Every entry point takes the acting user explicitly and checks it through
//! [`crate::access`] before reading anything else. Reports are computed over
//! whatever the source returns at call time and are never persisted.

use std::collections::BTreeMap;

use attendance_core::academic::AcademicConfig;
use attendance_core::calculations::{
    mean_percentage, required_sessions, session_weighted_percentage, AttendanceBand, Tally,
};
use attendance_core::error::{AttendanceError, Result};
use attendance_core::formatting::{format_date, format_optional_date, DateStyle};
use attendance_core::models::{
    Actor, AttendanceSession, AttendanceStats, AttendanceStatus, Class, Role, UserProfile,
};
use attendance_core::time_utils::{trailing_months, trailing_weeks, DateWindow};
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::{debug, warn};

use crate::access;
use crate::aggregator::{AttendanceAggregator, PeriodStats};
use crate::reader::{RosterSource, SessionFilter, SessionSource, StudentFilter};

pub const WEEKLY_TREND_BUCKETS: u32 = 12;
pub const MONTHLY_TREND_BUCKETS: u32 = 6;
pub const ADMIN_MONTHLY_BUCKETS: u32 = 6;

const UNASSIGNED_DEPARTMENT: &str = "Unassigned";

// ── Class report ──────────────────────────────────────────────────────────────

/// One student's attendance within a class report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentAttendance {
    pub uid: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roll_no: Option<String>,
    #[serde(flatten)]
    pub stats: AttendanceStats,
    pub band: AttendanceBand,
    /// The student's own sessions, oldest first, numbered from 1.
    pub timeline: Vec<TimelineEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntry {
    pub number: u32,
    pub session_id: String,
    pub date: DateTime<Utc>,
    pub topic: String,
    pub status: AttendanceStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

/// One session of the merged class timeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    /// Position in the merged timeline, from 1.
    pub number: u32,
    /// Number stored on the session when it was taken.
    pub original_number: u32,
    pub session_id: String,
    pub class_id: String,
    pub date: DateTime<Utc>,
    pub topic: String,
    pub duration_minutes: u32,
    pub total_students: u32,
    pub present: u32,
    pub absent: u32,
    pub late: u32,
    pub attendance_percentage: u32,
}

/// Attendance for a class, merged with every other class record that teaches
/// the same subject to the same division or batch under the same faculty.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassReport {
    pub class_id: String,
    pub class_name: String,
    pub subject: String,
    /// `"Division 5"` or `"Batch K5"`.
    pub group: String,
    pub faculty_id: String,
    pub faculty_name: String,
    /// Every class record folded into this report, sorted.
    pub merged_class_ids: Vec<String>,
    pub window: DateWindow,
    pub total_students: u32,
    pub total_sessions: u32,
    /// Unweighted mean of the per-student percentages.
    pub average_attendance: u32,
    /// Attended student-slots over all student-slots.
    pub session_weighted_attendance: u32,
    /// Lowest attendance first.
    pub students: Vec<StudentAttendance>,
    pub sessions: Vec<SessionSummary>,
}

impl ClassReport {
    fn empty(class: &Class, merged: &[Class], window: DateWindow) -> Self {
        let mut merged_class_ids: Vec<String> = merged.iter().map(|c| c.id.clone()).collect();
        merged_class_ids.sort();
        Self {
            class_id: class.id.clone(),
            class_name: class.name.clone(),
            subject: class.subject.clone(),
            group: class.kind.label(),
            faculty_id: class.faculty_id.clone(),
            faculty_name: class.faculty_name.clone(),
            merged_class_ids,
            window,
            total_students: 0,
            total_sessions: 0,
            average_attendance: 0,
            session_weighted_attendance: 0,
            students: Vec::new(),
            sessions: Vec::new(),
        }
    }

    /// Whether more than one class record contributed sessions.
    pub fn is_merged(&self) -> bool {
        self.merged_class_ids.len() > 1
    }

    /// Suggested file name for [`ClassReport::to_csv`].
    pub fn export_file_name(&self) -> String {
        let sanitize = |s: &str| -> String {
            s.chars()
                .map(|c| if c.is_alphanumeric() { c } else { '_' })
                .collect()
        };
        format!(
            "{}_{}_aggregated_report.csv",
            sanitize(&self.subject),
            sanitize(&self.group)
        )
    }

    /// Render the report as CSV: a block of summary lines, a blank line, then
    /// one row per student.
    pub fn to_csv(&self, tz: Tz, generated_on: NaiveDate) -> String {
        let mut lines: Vec<String> = vec![
            csv_field(&format!("Subject: {}", self.subject)),
            csv_field(&self.group),
        ];
        if self.is_merged() {
            lines.push(format!(
                "Combined data from {} class records",
                self.merged_class_ids.len()
            ));
        }
        lines.push(csv_field(&format!(
            "Period: {}",
            describe_window(&self.window, tz)
        )));
        lines.push(format!("Total Students: {}", self.total_students));
        lines.push(format!("Total Sessions: {}", self.total_sessions));
        lines.push(format!("Average Attendance: {}%", self.average_attendance));
        lines.push(format!(
            "Session-weighted Attendance: {}%",
            self.session_weighted_attendance
        ));
        lines.push(format!("Report Generated: {}", generated_on.format("%Y-%m-%d")));
        lines.push(String::new());
        lines.push(
            "Student Name,Student ID,Roll No,Total Sessions,Present,Late,Absent,Attendance %"
                .to_string(),
        );

        for student in &self.students {
            let row = [
                csv_field(&student.name),
                csv_field(student.student_id.as_deref().unwrap_or("")),
                csv_field(student.roll_no.as_deref().unwrap_or("")),
                student.stats.total_sessions.to_string(),
                student.stats.present_sessions.to_string(),
                student.stats.late_sessions.to_string(),
                student.stats.absent_sessions.to_string(),
                format!("{}%", student.stats.attendance_percentage),
            ];
            lines.push(row.join(","));
        }

        let mut out = lines.join("\n");
        out.push('\n');
        out
    }
}

// ── Student / faculty / admin reports ─────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentClassAttendance {
    pub class_id: String,
    pub class_name: String,
    pub subject: String,
    pub group: String,
    pub faculty_name: String,
    #[serde(flatten)]
    pub stats: AttendanceStats,
    pub band: AttendanceBand,
    /// Consecutive attended sessions needed to reach the minimum.
    pub sessions_to_minimum: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentReport {
    pub uid: String,
    pub name: String,
    pub window: DateWindow,
    pub classes: Vec<StudentClassAttendance>,
    /// Sums across every class; the percentage is recomputed from the sums.
    pub overall: AttendanceStats,
    pub band: AttendanceBand,
    pub minimum_attendance: u32,
    pub sessions_to_minimum: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacultyClassSummary {
    pub class_id: String,
    pub class_name: String,
    pub subject: String,
    pub group: String,
    pub total_students: u32,
    pub total_sessions: u32,
    /// Session-weighted.
    pub attendance_percentage: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacultyReport {
    pub uid: String,
    pub name: String,
    pub window: DateWindow,
    pub classes: Vec<FacultyClassSummary>,
    pub total_sessions: u32,
    /// Session-weighted across every class.
    pub overall_attendance: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentStats {
    pub department: String,
    pub students: u32,
    pub classes: u32,
    /// Mean of the session-weighted averages of classes that held sessions.
    pub average_attendance: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminReport {
    pub window: DateWindow,
    pub total_students: u32,
    pub total_faculty: u32,
    pub active_classes: u32,
    pub total_sessions: u32,
    pub overall_attendance: u32,
    pub departments: Vec<DepartmentStats>,
    /// Trailing calendar months regardless of the window, oldest first.
    pub monthly: Vec<PeriodStats>,
}

// ── Low attendance & trends ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LowAttendanceEntry {
    pub uid: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roll_no: Option<String>,
    pub class_id: String,
    pub class_name: String,
    pub subject: String,
    #[serde(flatten)]
    pub stats: AttendanceStats,
    pub sessions_to_threshold: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendPeriod {
    Weekly,
    Monthly,
}

impl std::str::FromStr for TrendPeriod {
    type Err = AttendanceError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "weekly" => Ok(TrendPeriod::Weekly),
            "monthly" => Ok(TrendPeriod::Monthly),
            other => Err(AttendanceError::Config(format!(
                "unknown trend period '{other}', expected weekly or monthly"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendReport {
    pub period: TrendPeriod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub faculty_id: Option<String>,
    pub buckets: Vec<PeriodStats>,
}

// ── ReportBuilder ─────────────────────────────────────────────────────────────

/// A session known to have a date.
struct DatedSession {
    date: DateTime<Utc>,
    session: AttendanceSession,
}

/// Builds reports from a roster and session source.
pub struct ReportBuilder<'a, S> {
    source: &'a S,
    academic: &'a AcademicConfig,
    tz: Tz,
    now: DateTime<Utc>,
}

impl<'a, S> ReportBuilder<'a, S>
where
    S: RosterSource + SessionSource,
{
    pub fn new(source: &'a S, academic: &'a AcademicConfig, tz: Tz) -> Self {
        Self {
            source,
            academic,
            tz,
            now: Utc::now(),
        }
    }

    /// Pin the clock used for trend buckets and default windows.
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// The academic lookback ending now.
    pub fn default_window(&self) -> DateWindow {
        DateWindow::lookback(self.now, self.academic.default_lookback_days)
    }

    /// Report for `class_id` merged with its sibling class records.
    ///
    /// Sessions are sorted by date and renumbered from 1. Sessions without a
    /// date are excluded. An empty roster yields a zero report.
    pub fn class_report(
        &self,
        actor: &Actor,
        class_id: &str,
        window: DateWindow,
    ) -> Result<ClassReport> {
        let class = self
            .source
            .class(class_id)?
            .ok_or_else(|| AttendanceError::not_found("class", class_id))?;
        access::ensure_class_access(actor, &class)?;

        let merged: Vec<Class> = self
            .source
            .classes()?
            .into_iter()
            .filter(|c| c.same_offering(&class))
            .collect();
        let mut report = ClassReport::empty(&class, &merged, window);

        let roster = self.roster(&merged)?;
        if roster.is_empty() {
            debug!("Class {} has no students, returning an empty report", class.id);
            return Ok(report);
        }

        let sessions = self.class_sessions(merged.iter().map(|c| c.id.as_str()), window)?;

        report.sessions = sessions
            .iter()
            .enumerate()
            .map(|(index, dated)| summarize_session(index as u32 + 1, dated))
            .collect();

        let mut students: Vec<StudentAttendance> = roster
            .iter()
            .map(|student| student_attendance(student, &sessions))
            .collect();
        students.sort_by(|a, b| {
            a.stats
                .attendance_percentage
                .cmp(&b.stats.attendance_percentage)
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.uid.cmp(&b.uid))
        });

        let percentages: Vec<u32> = students
            .iter()
            .map(|s| s.stats.attendance_percentage)
            .collect();

        report.total_students = students.len() as u32;
        report.total_sessions = sessions.len() as u32;
        report.average_attendance = mean_percentage(&percentages);
        report.session_weighted_attendance =
            session_weighted_percentage(sessions.iter().map(|d| &d.session));
        report.students = students;

        debug!(
            "Class report {}: {} records merged, {} students, {} sessions",
            class.id,
            report.merged_class_ids.len(),
            report.total_students,
            report.total_sessions
        );

        Ok(report)
    }

    /// Per-class attendance for one student.
    pub fn student_report(
        &self,
        actor: &Actor,
        student_id: &str,
        window: DateWindow,
    ) -> Result<StudentReport> {
        access::ensure_self_or_admin(actor, Role::Student, student_id)?;
        let student = self
            .source
            .user(student_id)?
            .filter(UserProfile::is_student)
            .ok_or_else(|| AttendanceError::not_found("student", student_id))?;

        let minimum = self.academic.minimum_attendance;
        let mut classes = Vec::new();
        for class in self
            .source
            .classes()?
            .into_iter()
            .filter(|c| roster_includes(c, &student))
        {
            let sessions = self.class_sessions(std::iter::once(class.id.as_str()), window)?;
            let stats =
                AttendanceAggregator::student_stats(sessions.iter().map(|d| &d.session), &student.uid);
            classes.push(StudentClassAttendance {
                class_id: class.id.clone(),
                class_name: class.name.clone(),
                subject: class.subject.clone(),
                group: class.kind.label(),
                faculty_name: class.faculty_name.clone(),
                band: AttendanceBand::from_percentage(stats.attendance_percentage),
                sessions_to_minimum: required_sessions(stats.attended(), stats.total(), minimum),
                stats,
            });
        }
        classes.sort_by(|a, b| {
            a.subject
                .cmp(&b.subject)
                .then_with(|| a.class_name.cmp(&b.class_name))
        });

        let overall = AttendanceAggregator::combine(classes.iter().map(|c| &c.stats));

        Ok(StudentReport {
            uid: student.uid,
            name: student.name,
            window,
            band: AttendanceBand::from_percentage(overall.attendance_percentage),
            minimum_attendance: minimum,
            sessions_to_minimum: required_sessions(overall.attended(), overall.total(), minimum),
            overall,
            classes,
        })
    }

    /// Per-class summary for one faculty member.
    pub fn faculty_report(
        &self,
        actor: &Actor,
        faculty_id: &str,
        window: DateWindow,
    ) -> Result<FacultyReport> {
        access::ensure_self_or_admin(actor, Role::Faculty, faculty_id)?;
        let faculty = self
            .source
            .user(faculty_id)?
            .filter(UserProfile::is_faculty)
            .ok_or_else(|| AttendanceError::not_found("faculty", faculty_id))?;

        let mut classes = Vec::new();
        let mut all_sessions: Vec<DatedSession> = Vec::new();
        for class in self
            .source
            .classes()?
            .into_iter()
            .filter(|c| c.faculty_id == faculty.uid)
        {
            let roster = self.roster(std::slice::from_ref(&class))?;
            let sessions = self.class_sessions(std::iter::once(class.id.as_str()), window)?;
            classes.push(FacultyClassSummary {
                class_id: class.id.clone(),
                class_name: class.name.clone(),
                subject: class.subject.clone(),
                group: class.kind.label(),
                total_students: roster.len() as u32,
                total_sessions: sessions.len() as u32,
                attendance_percentage: session_weighted_percentage(
                    sessions.iter().map(|d| &d.session),
                ),
            });
            all_sessions.extend(sessions);
        }
        classes.sort_by(|a, b| {
            a.subject
                .cmp(&b.subject)
                .then_with(|| a.group.cmp(&b.group))
                .then_with(|| a.class_id.cmp(&b.class_id))
        });

        Ok(FacultyReport {
            uid: faculty.uid,
            name: faculty.name,
            window,
            total_sessions: all_sessions.len() as u32,
            overall_attendance: session_weighted_percentage(
                all_sessions.iter().map(|d| &d.session),
            ),
            classes,
        })
    }

    /// College-wide overview.
    pub fn admin_report(&self, actor: &Actor, window: DateWindow) -> Result<AdminReport> {
        access::ensure_admin(actor)?;

        let students = self.source.users_with_role(Role::Student)?;
        let faculty = self.source.users_with_role(Role::Faculty)?;
        let classes = self.source.classes()?;
        let all_sessions = self.source.sessions(&SessionFilter::default())?;
        let windowed = self.dated_in_window(all_sessions.clone(), window);

        #[derive(Default)]
        struct DepartmentAccumulator {
            students: u32,
            classes: u32,
            class_averages: Vec<u32>,
        }

        let mut departments: BTreeMap<String, DepartmentAccumulator> = BTreeMap::new();
        for student in &students {
            departments
                .entry(department_key(student.department.as_deref()))
                .or_default()
                .students += 1;
        }
        for class in &classes {
            let dept = departments
                .entry(department_key(Some(class.department.as_str())))
                .or_default();
            dept.classes += 1;

            let class_sessions: Vec<&AttendanceSession> = windowed
                .iter()
                .map(|d| &d.session)
                .filter(|s| s.class_id == class.id)
                .collect();
            let slots: u32 = class_sessions.iter().map(|s| s.total()).sum();
            if slots > 0 {
                dept.class_averages
                    .push(session_weighted_percentage(class_sessions));
            }
        }

        let periods = trailing_months(self.now, ADMIN_MONTHLY_BUCKETS, self.tz);

        Ok(AdminReport {
            window,
            total_students: students.len() as u32,
            total_faculty: faculty.len() as u32,
            active_classes: classes.iter().filter(|c| c.is_active).count() as u32,
            total_sessions: windowed.len() as u32,
            overall_attendance: session_weighted_percentage(windowed.iter().map(|d| &d.session)),
            departments: departments
                .into_iter()
                .map(|(department, acc)| DepartmentStats {
                    department,
                    students: acc.students,
                    classes: acc.classes,
                    average_attendance: mean_percentage(&acc.class_averages),
                })
                .collect(),
            monthly: AttendanceAggregator::aggregate_by_period(&all_sessions, &periods),
        })
    }

    /// Every (student, class) pair below `threshold`, lowest first.
    ///
    /// Defaults to the academic minimum. Students without any session in a
    /// class are not listed for it.
    pub fn low_attendance(
        &self,
        actor: &Actor,
        threshold: Option<u32>,
        class_id: Option<&str>,
        window: DateWindow,
    ) -> Result<Vec<LowAttendanceEntry>> {
        let scope = access::faculty_scope(actor, None)?;
        let threshold = threshold.unwrap_or(self.academic.minimum_attendance);

        let classes: Vec<Class> = match class_id {
            Some(id) => {
                let class = self
                    .source
                    .class(id)?
                    .ok_or_else(|| AttendanceError::not_found("class", id))?;
                access::ensure_class_access(actor, &class)?;
                vec![class]
            }
            None => self
                .source
                .classes()?
                .into_iter()
                .filter(|c| scope.as_ref().map_or(true, |f| c.faculty_id == *f))
                .collect(),
        };

        let mut entries = Vec::new();
        for class in &classes {
            let roster = self.roster(std::slice::from_ref(class))?;
            if roster.is_empty() {
                continue;
            }
            let sessions = self.class_sessions(std::iter::once(class.id.as_str()), window)?;
            for student in roster {
                let stats = AttendanceAggregator::student_stats(
                    sessions.iter().map(|d| &d.session),
                    &student.uid,
                );
                if stats.total_sessions == 0 || stats.attendance_percentage >= threshold {
                    continue;
                }
                entries.push(LowAttendanceEntry {
                    uid: student.uid,
                    name: student.name,
                    roll_no: student.roll_no,
                    class_id: class.id.clone(),
                    class_name: class.name.clone(),
                    subject: class.subject.clone(),
                    sessions_to_threshold: required_sessions(
                        stats.attended(),
                        stats.total(),
                        threshold,
                    ),
                    stats,
                });
            }
        }

        entries.sort_by(|a, b| {
            a.stats
                .attendance_percentage
                .cmp(&b.stats.attendance_percentage)
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.class_name.cmp(&b.class_name))
        });
        Ok(entries)
    }

    /// Sessions and session-weighted attendance per trailing week or month.
    pub fn trends(
        &self,
        actor: &Actor,
        period: TrendPeriod,
        class_id: Option<&str>,
        faculty_id: Option<&str>,
    ) -> Result<TrendReport> {
        let faculty_scope = access::faculty_scope(actor, faculty_id)?;
        if let Some(id) = class_id {
            let class = self
                .source
                .class(id)?
                .ok_or_else(|| AttendanceError::not_found("class", id))?;
            access::ensure_class_access(actor, &class)?;
        }

        let sessions = self.source.sessions(&SessionFilter {
            class_id: class_id.map(str::to_string),
            faculty_id: faculty_scope.clone(),
            window: DateWindow::unbounded(),
        })?;

        let periods = match period {
            TrendPeriod::Weekly => trailing_weeks(self.now, WEEKLY_TREND_BUCKETS, self.tz),
            TrendPeriod::Monthly => trailing_months(self.now, MONTHLY_TREND_BUCKETS, self.tz),
        };

        Ok(TrendReport {
            period,
            class_id: class_id.map(str::to_string),
            faculty_id: faculty_scope,
            buckets: AttendanceAggregator::aggregate_by_period(&sessions, &periods),
        })
    }

    // ── Private ───────────────────────────────────────────────────────────────

    /// Students of `classes`: the union of each class's own roster, which is
    /// its explicit student list or, when that is empty, the approved
    /// students of its division or batch.
    fn roster(&self, classes: &[Class]) -> Result<Vec<UserProfile>> {
        let mut roster: BTreeMap<String, UserProfile> = BTreeMap::new();
        for class in classes {
            if class.students.is_empty() {
                for profile in self.source.students(&StudentFilter::for_kind(&class.kind))? {
                    roster.entry(profile.uid.clone()).or_insert(profile);
                }
                continue;
            }
            for uid in &class.students {
                if roster.contains_key(uid) {
                    continue;
                }
                let profile = match self.source.user(uid)? {
                    Some(profile) => profile,
                    None => {
                        warn!("Roster entry {} of class {} has no user profile", uid, class.id);
                        UserProfile::new(uid, uid, Role::Student)
                    }
                };
                roster.insert(uid.clone(), profile);
            }
        }
        Ok(roster.into_values().collect())
    }

    /// Dated sessions of `class_ids` inside `window`, oldest first.
    fn class_sessions<'c>(
        &self,
        class_ids: impl IntoIterator<Item = &'c str>,
        window: DateWindow,
    ) -> Result<Vec<DatedSession>> {
        let mut sessions = Vec::new();
        for id in class_ids {
            sessions.extend(
                self.source
                    .sessions(&SessionFilter::for_class(id).within(window))?,
            );
        }
        Ok(self.dated_in_window(sessions, window))
    }

    fn dated_in_window(
        &self,
        sessions: Vec<AttendanceSession>,
        window: DateWindow,
    ) -> Vec<DatedSession> {
        let undated = sessions.iter().filter(|s| s.date.is_none()).count();
        if undated > 0 {
            warn!("Excluded {} sessions without a valid date", undated);
        }

        let mut dated: Vec<DatedSession> = sessions
            .into_iter()
            .filter_map(|session| {
                let date = session.date?;
                window.contains(Some(date)).then_some(DatedSession { date, session })
            })
            .collect();
        dated.sort_by(|a, b| {
            a.date
                .cmp(&b.date)
                .then_with(|| a.session.class_id.cmp(&b.session.class_id))
                .then_with(|| a.session.session_number.cmp(&b.session.session_number))
                .then_with(|| a.session.id.cmp(&b.session.id))
        });
        dated
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn summarize_session(number: u32, dated: &DatedSession) -> SessionSummary {
    let s = &dated.session;
    SessionSummary {
        number,
        original_number: s.session_number,
        session_id: s.id.clone(),
        class_id: s.class_id.clone(),
        date: dated.date,
        topic: s.topic.clone(),
        duration_minutes: s.duration_minutes,
        total_students: s.total_students(),
        present: s.present_count(),
        absent: s.absent_count(),
        late: s.late_count(),
        attendance_percentage: s.percentage(),
    }
}

fn student_attendance(student: &UserProfile, sessions: &[DatedSession]) -> StudentAttendance {
    let stats =
        AttendanceAggregator::student_stats(sessions.iter().map(|d| &d.session), &student.uid);

    let timeline = sessions
        .iter()
        .filter_map(|d| d.session.record_for(&student.uid).map(|r| (d, r)))
        .enumerate()
        .map(|(index, (d, record))| TimelineEntry {
            number: index as u32 + 1,
            session_id: d.session.id.clone(),
            date: d.date,
            topic: d.session.topic.clone(),
            status: record.status,
            remarks: record.remarks.clone(),
        })
        .collect();

    StudentAttendance {
        uid: student.uid.clone(),
        name: student.name.clone(),
        student_id: student.student_id.clone(),
        roll_no: student.roll_no.clone(),
        band: AttendanceBand::from_percentage(stats.attendance_percentage),
        stats,
        timeline,
    }
}

/// Whether `student` is on the roster of `class`.
fn roster_includes(class: &Class, student: &UserProfile) -> bool {
    if class.students.is_empty() {
        student.approved && class.kind.includes(student)
    } else {
        class.students.iter().any(|id| *id == student.uid)
    }
}

fn department_key(department: Option<&str>) -> String {
    match department.map(str::trim) {
        Some(d) if !d.is_empty() => d.to_string(),
        _ => UNASSIGNED_DEPARTMENT.to_string(),
    }
}

/// Human-readable window, e.g. `"2024-08-01 to 2024-08-31"` or `"All dates"`.
pub fn describe_window(window: &DateWindow, tz: Tz) -> String {
    match (window.start, window.end) {
        (None, None) => "All dates".to_string(),
        (Some(start), None) => format!("From {}", format_date(start, tz, DateStyle::Iso)),
        (None, Some(end)) => format!("Until {}", format_date(end, tz, DateStyle::Iso)),
        (start, end) => format!(
            "{} to {}",
            format_optional_date(start, tz, DateStyle::Iso),
            format_optional_date(end, tz, DateStyle::Iso)
        ),
    }
}

/// Quote a CSV field when it contains a separator, quote or newline.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
