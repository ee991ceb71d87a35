//! Plain-text table output for the report commands.

use attendance_core::formatting::{
    format_count, format_date, format_duration, format_percentage, DateStyle,
};
use attendance_data::csv_import::CsvValidation;
use attendance_data::report::{
    describe_window, AdminReport, ClassReport, FacultyReport, LowAttendanceEntry, StudentReport,
    TrendReport,
};
use attendance_runtime::importer::ImportSummary;
use chrono_tz::Tz;
use unicode_width::UnicodeWidthStr;

// ── TextTable ─────────────────────────────────────────────────────────────────

/// Column-aligned table. Widths are measured in terminal columns, so names
/// in non-Latin scripts line up.
pub struct TextTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    /// Columns aligned right (numbers).
    numeric: Vec<bool>,
}

impl TextTable {
    pub fn new(headers: &[&str]) -> Self {
        Self {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
            numeric: vec![false; headers.len()],
        }
    }

    pub fn numeric(mut self, columns: &[usize]) -> Self {
        for &c in columns {
            if let Some(flag) = self.numeric.get_mut(c) {
                *flag = true;
            }
        }
        self
    }

    pub fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn render(&self) -> String {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.width()).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                if let Some(w) = widths.get_mut(i) {
                    *w = (*w).max(cell.width());
                }
            }
        }

        let mut out = String::new();
        out.push_str(&self.line(&self.headers, &widths));
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        out.push_str(&rule.join("  "));
        out.push('\n');
        for row in &self.rows {
            out.push_str(&self.line(row, &widths));
        }
        out
    }

    fn line(&self, cells: &[String], widths: &[usize]) -> String {
        let padded: Vec<String> = widths
            .iter()
            .enumerate()
            .map(|(i, &width)| {
                let cell = cells.get(i).map(String::as_str).unwrap_or("");
                let fill = " ".repeat(width.saturating_sub(cell.width()));
                if self.numeric[i] {
                    format!("{fill}{cell}")
                } else {
                    format!("{cell}{fill}")
                }
            })
            .collect();
        let mut line = padded.join("  ").trim_end().to_string();
        line.push('\n');
        line
    }
}

fn heading(title: &str) -> String {
    format!("{}\n{}\n", title, "=".repeat(title.width()))
}

fn field(label: &str, value: impl std::fmt::Display) -> String {
    format!("{:<22}{}\n", format!("{label}:"), value)
}

// ── Reports ───────────────────────────────────────────────────────────────────

pub fn class_report(report: &ClassReport, tz: Tz) -> String {
    let mut out = heading(&format!("{} ({})", report.subject, report.group));
    out.push_str(&field(
        "Faculty",
        if report.faculty_name.is_empty() {
            &report.faculty_id
        } else {
            &report.faculty_name
        },
    ));
    if report.is_merged() {
        out.push_str(&field("Merged classes", report.merged_class_ids.join(", ")));
    }
    out.push_str(&field("Period", describe_window(&report.window, tz)));
    out.push_str(&field("Students", report.total_students));
    out.push_str(&field("Sessions", report.total_sessions));
    out.push_str(&field(
        "Average attendance",
        format_percentage(report.average_attendance),
    ));
    out.push_str(&field(
        "Session-weighted",
        format_percentage(report.session_weighted_attendance),
    ));

    if !report.students.is_empty() {
        let mut table = TextTable::new(&[
            "Student", "ID", "Roll", "Total", "Present", "Late", "Absent", "%", "Band",
        ])
        .numeric(&[3, 4, 5, 6, 7]);
        for s in &report.students {
            table.push(vec![
                s.name.clone(),
                s.student_id.clone().unwrap_or_default(),
                s.roll_no.clone().unwrap_or_default(),
                s.stats.total_sessions.to_string(),
                s.stats.present_sessions.to_string(),
                s.stats.late_sessions.to_string(),
                s.stats.absent_sessions.to_string(),
                format_percentage(s.stats.attendance_percentage),
                s.band.label().to_string(),
            ]);
        }
        out.push('\n');
        out.push_str(&table.render());
    }

    if !report.sessions.is_empty() {
        let mut table = TextTable::new(&[
            "#", "Date", "Topic", "Length", "Present", "Late", "Absent", "%",
        ])
        .numeric(&[0, 3, 4, 5, 6, 7]);
        for s in &report.sessions {
            table.push(vec![
                s.number.to_string(),
                format_date(s.date, tz, DateStyle::Short),
                s.topic.clone(),
                format_duration(s.duration_minutes),
                s.present.to_string(),
                s.late.to_string(),
                s.absent.to_string(),
                format_percentage(s.attendance_percentage),
            ]);
        }
        out.push('\n');
        out.push_str(&table.render());
    }
    out
}

pub fn student_report(report: &StudentReport, tz: Tz) -> String {
    let mut out = heading(&report.name);
    out.push_str(&field("Period", describe_window(&report.window, tz)));
    out.push_str(&field(
        "Overall",
        format!(
            "{} ({} of {} sessions, {})",
            format_percentage(report.overall.attendance_percentage),
            report.overall.present_sessions + report.overall.late_sessions,
            report.overall.total_sessions,
            report.band.label()
        ),
    ));
    out.push_str(&field(
        "Minimum required",
        format_percentage(report.minimum_attendance),
    ));
    out.push_str(&field(
        "Sessions to minimum",
        sessions_needed(report.sessions_to_minimum),
    ));

    if !report.classes.is_empty() {
        let mut table = TextTable::new(&[
            "Subject", "Group", "Faculty", "Total", "Present", "Late", "Absent", "%", "Needed",
        ])
        .numeric(&[3, 4, 5, 6, 7, 8]);
        for c in &report.classes {
            table.push(vec![
                c.subject.clone(),
                c.group.clone(),
                c.faculty_name.clone(),
                c.stats.total_sessions.to_string(),
                c.stats.present_sessions.to_string(),
                c.stats.late_sessions.to_string(),
                c.stats.absent_sessions.to_string(),
                format_percentage(c.stats.attendance_percentage),
                sessions_needed(c.sessions_to_minimum),
            ]);
        }
        out.push('\n');
        out.push_str(&table.render());
    }
    out
}

pub fn faculty_report(report: &FacultyReport, tz: Tz) -> String {
    let mut out = heading(&report.name);
    out.push_str(&field("Period", describe_window(&report.window, tz)));
    out.push_str(&field("Sessions", report.total_sessions));
    out.push_str(&field(
        "Overall attendance",
        format_percentage(report.overall_attendance),
    ));

    if !report.classes.is_empty() {
        let mut table = TextTable::new(&["Class", "Subject", "Group", "Students", "Sessions", "%"])
            .numeric(&[3, 4, 5]);
        for c in &report.classes {
            table.push(vec![
                c.class_name.clone(),
                c.subject.clone(),
                c.group.clone(),
                c.total_students.to_string(),
                c.total_sessions.to_string(),
                format_percentage(c.attendance_percentage),
            ]);
        }
        out.push('\n');
        out.push_str(&table.render());
    }
    out
}

pub fn admin_report(report: &AdminReport, tz: Tz) -> String {
    let mut out = heading("College overview");
    out.push_str(&field("Period", describe_window(&report.window, tz)));
    out.push_str(&field("Students", format_count(u64::from(report.total_students))));
    out.push_str(&field("Faculty", format_count(u64::from(report.total_faculty))));
    out.push_str(&field("Active classes", report.active_classes));
    out.push_str(&field("Sessions", format_count(u64::from(report.total_sessions))));
    out.push_str(&field(
        "Overall attendance",
        format_percentage(report.overall_attendance),
    ));

    if !report.departments.is_empty() {
        let mut table =
            TextTable::new(&["Department", "Students", "Classes", "Average"]).numeric(&[1, 2, 3]);
        for d in &report.departments {
            table.push(vec![
                d.department.clone(),
                d.students.to_string(),
                d.classes.to_string(),
                format_percentage(d.average_attendance),
            ]);
        }
        out.push('\n');
        out.push_str(&table.render());
    }

    let mut table = TextTable::new(&["Month", "Sessions", "%"]).numeric(&[1, 2]);
    for m in &report.monthly {
        table.push(vec![
            m.label.clone(),
            m.sessions.to_string(),
            format_percentage(m.attendance_percentage),
        ]);
    }
    out.push('\n');
    out.push_str(&table.render());
    out
}

pub fn low_attendance(entries: &[LowAttendanceEntry], threshold: u32) -> String {
    if entries.is_empty() {
        return format!(
            "No students below {}.\n",
            format_percentage(threshold)
        );
    }
    let mut table = TextTable::new(&["Student", "Roll", "Class", "Total", "%", "Needed"])
        .numeric(&[3, 4, 5]);
    for e in entries {
        table.push(vec![
            e.name.clone(),
            e.roll_no.clone().unwrap_or_default(),
            e.class_name.clone(),
            e.stats.total_sessions.to_string(),
            format_percentage(e.stats.attendance_percentage),
            sessions_needed(e.sessions_to_threshold),
        ]);
    }
    let mut out = heading(&format!(
        "{} below {}",
        entries.len(),
        format_percentage(threshold)
    ));
    out.push_str(&table.render());
    out
}

pub fn trends(report: &TrendReport) -> String {
    let mut table =
        TextTable::new(&["Period", "Sessions", "Attended", "Slots", "%"]).numeric(&[1, 2, 3, 4]);
    for b in &report.buckets {
        table.push(vec![
            b.label.clone(),
            b.sessions.to_string(),
            b.attended.to_string(),
            b.student_slots.to_string(),
            format_percentage(b.attendance_percentage),
        ]);
    }
    table.render()
}

// ── CSV import ────────────────────────────────────────────────────────────────

pub fn validation(result: &CsvValidation) -> String {
    match result {
        CsvValidation::Valid(rows) => {
            format!("Valid {} CSV: {} rows\n", rows.kind(), rows.len())
        }
        CsvValidation::Invalid { errors } => {
            let mut out = format!("Invalid CSV: {} problems\n", errors.len());
            for e in errors {
                out.push_str("  ");
                out.push_str(e);
                out.push('\n');
            }
            out
        }
    }
}

pub fn import_summary(summary: &ImportSummary) -> String {
    let mut out = format!(
        "Imported {} accounts, {} failed\n",
        summary.success, summary.errors
    );
    for detail in &summary.error_details {
        out.push_str("  ");
        out.push_str(detail);
        out.push('\n');
    }
    out
}

/// `None` means the target can no longer be reached.
fn sessions_needed(needed: Option<u32>) -> String {
    match needed {
        Some(0) => "-".to_string(),
        Some(n) => n.to_string(),
        None => "unreachable".to_string(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use attendance_data::aggregator::PeriodStats;
    use attendance_data::report::TrendPeriod;

    #[test]
    fn test_table_aligns_by_display_width() {
        let mut table = TextTable::new(&["Name", "%"]).numeric(&[1]);
        table.push(vec!["अनन्या".to_string(), "100%".to_string()]);
        table.push(vec!["Bo".to_string(), "5%".to_string()]);
        let rendered = table.render();
        let lines: Vec<&str> = rendered.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("Name"));
        assert!(lines[3].starts_with("Bo "));
        assert!(lines[3].ends_with("  5%"));
        let widths: Vec<usize> = lines.iter().map(|l| l.width()).collect();
        assert_eq!(widths[1], widths[2]);
        assert_eq!(widths[2], widths[3]);
    }

    #[test]
    fn test_trends_render() {
        let report = TrendReport {
            period: TrendPeriod::Monthly,
            class_id: None,
            faculty_id: None,
            buckets: vec![PeriodStats {
                label: "Aug 2024".to_string(),
                sessions: 3,
                attended: 5,
                student_slots: 6,
                attendance_percentage: 83,
            }],
        };
        let out = trends(&report);
        assert!(out.contains("Aug 2024"));
        assert!(out.contains("83%"));
    }

    #[test]
    fn test_validation_lists_errors() {
        let out = validation(&CsvValidation::Invalid {
            errors: vec!["Row 2: Missing value for sId".to_string()],
        });
        assert!(out.starts_with("Invalid CSV: 1 problems"));
        assert!(out.contains("  Row 2: Missing value for sId"));
    }

    #[test]
    fn test_import_summary() {
        let out = import_summary(&ImportSummary {
            success: 2,
            errors: 1,
            error_details: vec!["Student ST9: An account already exists for x".to_string()],
        });
        assert!(out.starts_with("Imported 2 accounts, 1 failed"));
        assert!(out.contains("Student ST9"));
    }

    #[test]
    fn test_sessions_needed() {
        assert_eq!(sessions_needed(Some(0)), "-");
        assert_eq!(sessions_needed(Some(4)), "4");
        assert_eq!(sessions_needed(None), "unreachable");
    }
}
