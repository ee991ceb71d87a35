use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::data_processors::TimestampProcessor;
use crate::error::AttendanceError;

// ── Roles & actors ────────────────────────────────────────────────────────────

/// Account role within the college.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Faculty,
    Student,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Faculty => "faculty",
            Role::Student => "student",
        }
    }
}

impl FromStr for Role {
    type Err = AttendanceError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "faculty" => Ok(Role::Faculty),
            "student" => Ok(Role::Student),
            other => Err(AttendanceError::InvalidRole(other.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The identity on whose behalf a report is generated.
///
/// Every report entry point takes an `Actor` explicitly; there is no ambient
/// authentication state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub role: Role,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }

    pub fn admin(id: impl Into<String>) -> Self {
        Self::new(id, Role::Admin)
    }

    pub fn faculty(id: impl Into<String>) -> Self {
        Self::new(id, Role::Faculty)
    }

    pub fn student(id: impl Into<String>) -> Self {
        Self::new(id, Role::Student)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

// ── Users ─────────────────────────────────────────────────────────────────────

/// A user profile as stored by the account-management subsystem.
///
/// Student-only and faculty-only fields are optional; which ones are set
/// depends on [`UserProfile::role`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub uid: String,
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub approved: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roll_no: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub division: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elective_subject: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub designation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
}

impl UserProfile {
    /// Minimal profile with every optional field unset.
    pub fn new(uid: impl Into<String>, name: impl Into<String>, role: Role) -> Self {
        Self {
            uid: uid.into(),
            name: name.into(),
            email: String::new(),
            role,
            approved: true,
            student_id: None,
            roll_no: None,
            year: None,
            department: None,
            division: None,
            batch: None,
            elective_subject: None,
            employee_id: None,
            designation: None,
            subject: None,
        }
    }

    pub fn is_student(&self) -> bool {
        self.role == Role::Student
    }

    pub fn is_faculty(&self) -> bool {
        self.role == Role::Faculty
    }
}

// ── Classes ───────────────────────────────────────────────────────────────────

/// How a class derives its implicit roster.
///
/// A lecture (`type: "class"`) is taught to a whole division; a lab
/// (`type: "lab"`) is taught to a single batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClassKind {
    Division(String),
    Batch(String),
}

impl ClassKind {
    /// The division or batch code.
    pub fn code(&self) -> &str {
        match self {
            ClassKind::Division(code) | ClassKind::Batch(code) => code,
        }
    }

    /// Wire name of the class type (`"class"` or `"lab"`).
    pub fn type_name(&self) -> &'static str {
        match self {
            ClassKind::Division(_) => "class",
            ClassKind::Batch(_) => "lab",
        }
    }

    /// Human-readable label, e.g. `"Division 5"` or `"Batch K5"`.
    pub fn label(&self) -> String {
        match self {
            ClassKind::Division(code) => format!("Division {code}"),
            ClassKind::Batch(code) => format!("Batch {code}"),
        }
    }

    /// Whether `student` belongs to the group this kind describes.
    pub fn includes(&self, student: &UserProfile) -> bool {
        let field = match self {
            ClassKind::Division(_) => student.division.as_deref(),
            ClassKind::Batch(_) => student.batch.as_deref(),
        };
        field.map(str::trim) == Some(self.code())
    }
}

/// A class or lab taught by one faculty member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ClassRecord", into = "ClassRecord")]
pub struct Class {
    pub id: String,
    pub name: String,
    pub code: String,
    pub kind: ClassKind,
    pub subject: String,
    pub department: String,
    pub year: String,
    pub semester: String,
    pub faculty_id: String,
    pub faculty_name: String,
    /// Explicit roster of student uids. Empty means the roster is implied by
    /// [`Class::kind`].
    pub students: Vec<String>,
    pub is_active: bool,
}

impl Class {
    /// Whether `other` teaches the same subject to the same division or batch
    /// under the same faculty member.
    pub fn same_offering(&self, other: &Class) -> bool {
        self.faculty_id == other.faculty_id
            && self.subject == other.subject
            && self.kind == other.kind
    }
}

/// Stored shape of a [`Class`]: a `type` tag plus optional `division` and
/// `batch` fields of which exactly one must be set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub code: String,
    #[serde(rename = "type")]
    pub class_type: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub year: String,
    #[serde(default)]
    pub semester: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub division: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch: Option<String>,
    pub faculty_id: String,
    #[serde(default)]
    pub faculty_name: String,
    #[serde(default)]
    pub students: Vec<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl TryFrom<ClassRecord> for Class {
    type Error = AttendanceError;

    fn try_from(record: ClassRecord) -> Result<Self, Self::Error> {
        let division = non_blank(record.division);
        let batch = non_blank(record.batch);

        let kind = match (record.class_type.as_str(), division, batch) {
            ("class", Some(d), None) => ClassKind::Division(d),
            ("lab", None, Some(b)) => ClassKind::Batch(b),
            (other, d, b) => {
                return Err(AttendanceError::InvalidClassKind(format!(
                    "class {} has type '{}' with division {:?} and batch {:?}",
                    record.id, other, d, b
                )))
            }
        };

        Ok(Class {
            id: record.id,
            name: record.name,
            code: record.code,
            kind,
            subject: record.subject,
            department: record.department,
            year: record.year,
            semester: record.semester,
            faculty_id: record.faculty_id,
            faculty_name: record.faculty_name,
            students: record.students,
            is_active: record.is_active,
        })
    }
}

impl From<Class> for ClassRecord {
    fn from(class: Class) -> Self {
        let (division, batch) = match &class.kind {
            ClassKind::Division(d) => (Some(d.clone()), None),
            ClassKind::Batch(b) => (None, Some(b.clone())),
        };
        ClassRecord {
            id: class.id,
            name: class.name,
            code: class.code,
            class_type: class.kind.type_name().to_string(),
            subject: class.subject,
            department: class.department,
            year: class.year,
            semester: class.semester,
            division,
            batch,
            faculty_id: class.faculty_id,
            faculty_name: class.faculty_name,
            students: class.students,
            is_active: class.is_active,
        }
    }
}

// ── Attendance ────────────────────────────────────────────────────────────────

/// Status of one student in one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
}

impl AttendanceStatus {
    /// Late counts as attended.
    pub fn is_attended(&self) -> bool {
        matches!(self, AttendanceStatus::Present | AttendanceStatus::Late)
    }
}

impl FromStr for AttendanceStatus {
    type Err = AttendanceError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "present" => Ok(AttendanceStatus::Present),
            "absent" => Ok(AttendanceStatus::Absent),
            "late" => Ok(AttendanceStatus::Late),
            other => Err(AttendanceError::InvalidStatus(other.to_string())),
        }
    }
}

/// One student's entry in an attendance session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub student_id: String,
    #[serde(default)]
    pub student_name: String,
    pub status: AttendanceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

/// Descriptive fields of a session, supplied when it is taken.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionHeader {
    pub id: String,
    pub class_id: String,
    pub faculty_id: String,
    pub date: Option<DateTime<Utc>>,
    pub session_number: u32,
    pub topic: String,
    pub duration_minutes: u32,
}

/// A finalized attendance session.
///
/// Records and counts are fixed at construction; there is no API to change
/// them afterwards.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "SessionRecord")]
pub struct AttendanceSession {
    pub id: String,
    pub class_id: String,
    pub faculty_id: String,
    /// `None` when the stored date was missing or unparseable.
    pub date: Option<DateTime<Utc>>,
    pub session_number: u32,
    pub topic: String,
    pub duration_minutes: u32,
    records: Vec<AttendanceRecord>,
    total_students: u32,
    present_count: u32,
    absent_count: u32,
    late_count: u32,
}

impl AttendanceSession {
    /// Finalize a session, deriving its counts from `records`.
    pub fn new(header: SessionHeader, records: Vec<AttendanceRecord>) -> Self {
        let mut present = 0;
        let mut absent = 0;
        let mut late = 0;
        for record in &records {
            match record.status {
                AttendanceStatus::Present => present += 1,
                AttendanceStatus::Absent => absent += 1,
                AttendanceStatus::Late => late += 1,
            }
        }

        Self {
            id: header.id,
            class_id: header.class_id,
            faculty_id: header.faculty_id,
            date: header.date,
            session_number: header.session_number,
            topic: header.topic,
            duration_minutes: header.duration_minutes,
            total_students: records.len() as u32,
            records,
            present_count: present,
            absent_count: absent,
            late_count: late,
        }
    }

    pub fn records(&self) -> &[AttendanceRecord] {
        &self.records
    }

    /// The record for `student_id`, if the student was enrolled when the
    /// session was taken.
    pub fn record_for(&self, student_id: &str) -> Option<&AttendanceRecord> {
        self.records.iter().find(|r| r.student_id == student_id)
    }

    pub fn total_students(&self) -> u32 {
        self.total_students
    }

    pub fn present_count(&self) -> u32 {
        self.present_count
    }

    pub fn absent_count(&self) -> u32 {
        self.absent_count
    }

    pub fn late_count(&self) -> u32 {
        self.late_count
    }

    /// Present plus late.
    pub fn attended_count(&self) -> u32 {
        self.present_count + self.late_count
    }
}

/// Stored shape of an [`AttendanceSession`].
///
/// The date is kept as raw JSON because the store may hold it as an RFC 3339
/// string, a Unix number or a `{seconds, nanoseconds}` object. Stored counts
/// are ignored and re-derived from the records.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: String,
    pub class_id: String,
    #[serde(default)]
    pub faculty_id: String,
    #[serde(default)]
    pub date: serde_json::Value,
    #[serde(default)]
    pub session_number: u32,
    #[serde(default)]
    pub topic: String,
    #[serde(default, alias = "duration")]
    pub duration_minutes: u32,
    #[serde(default)]
    pub records: Vec<AttendanceRecord>,
}

impl From<SessionRecord> for AttendanceSession {
    fn from(raw: SessionRecord) -> Self {
        let date = TimestampProcessor::parse(&raw.date);
        AttendanceSession::new(
            SessionHeader {
                id: raw.id,
                class_id: raw.class_id,
                faculty_id: raw.faculty_id,
                date,
                session_number: raw.session_number,
                topic: raw.topic,
                duration_minutes: raw.duration_minutes,
            },
            raw.records,
        )
    }
}

/// Session number to assign to the next session of `class_id`.
///
/// Numbers increase monotonically and are never reused.
pub fn next_session_number(sessions: &[AttendanceSession], class_id: &str) -> u32 {
    sessions
        .iter()
        .filter(|s| s.class_id == class_id)
        .map(|s| s.session_number)
        .max()
        .map_or(1, |n| n + 1)
}

/// Attendance counts for one student over a set of sessions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceStats {
    pub total_sessions: u32,
    pub present_sessions: u32,
    pub absent_sessions: u32,
    pub late_sessions: u32,
    pub attendance_percentage: u32,
}

// ── Tests ─────────────────────────────────────────────────────────────────────
