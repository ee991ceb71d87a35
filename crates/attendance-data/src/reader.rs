//! Snapshot loading and the roster/session fetch contract.
//!
//! A snapshot directory holds `users.jsonl`, `classes.jsonl` and any number of
//! `*.jsonl` files of attendance sessions under `attendance/`. Reports are
//! computed over a [`Snapshot`] taken once per invocation; sessions created
//! afterwards are not seen.

use std::io::BufRead;
use std::path::{Path, PathBuf};

use attendance_core::error::{AttendanceError, Result};
use attendance_core::models::{Actor, AttendanceSession, Class, ClassKind, Role, UserProfile};
use attendance_core::time_utils::DateWindow;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

pub const USERS_FILE: &str = "users.jsonl";
pub const CLASSES_FILE: &str = "classes.jsonl";
pub const ATTENDANCE_DIR: &str = "attendance";

// ── Fetch contract ────────────────────────────────────────────────────────────

/// Roster lookup filter. `approved_only` excludes accounts awaiting approval.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudentFilter {
    pub division: Option<String>,
    pub batch: Option<String>,
    pub approved_only: bool,
}

impl StudentFilter {
    /// Approved students belonging to the group `kind` describes.
    pub fn for_kind(kind: &ClassKind) -> Self {
        match kind {
            ClassKind::Division(code) => Self {
                division: Some(code.clone()),
                batch: None,
                approved_only: true,
            },
            ClassKind::Batch(code) => Self {
                division: None,
                batch: Some(code.clone()),
                approved_only: true,
            },
        }
    }

    pub fn matches(&self, user: &UserProfile) -> bool {
        if !user.is_student() || (self.approved_only && !user.approved) {
            return false;
        }
        let field_matches = |wanted: &Option<String>, actual: &Option<String>| match wanted {
            Some(w) => actual.as_deref().map(str::trim) == Some(w.as_str()),
            None => true,
        };
        field_matches(&self.division, &user.division) && field_matches(&self.batch, &user.batch)
    }
}

/// Session fetch filter. Results are unordered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionFilter {
    pub class_id: Option<String>,
    pub faculty_id: Option<String>,
    /// Only applied when bounded; undated sessions pass an unbounded window.
    pub window: DateWindow,
}

impl SessionFilter {
    pub fn for_class(class_id: impl Into<String>) -> Self {
        Self {
            class_id: Some(class_id.into()),
            ..Self::default()
        }
    }

    pub fn for_faculty(faculty_id: impl Into<String>) -> Self {
        Self {
            faculty_id: Some(faculty_id.into()),
            ..Self::default()
        }
    }

    pub fn within(mut self, window: DateWindow) -> Self {
        self.window = window;
        self
    }

    pub fn matches(&self, session: &AttendanceSession) -> bool {
        if self.class_id.as_ref().is_some_and(|c| *c != session.class_id) {
            return false;
        }
        if self
            .faculty_id
            .as_ref()
            .is_some_and(|f| *f != session.faculty_id)
        {
            return false;
        }
        self.window.is_unbounded() || self.window.contains(session.date)
    }
}

/// Source of user profiles and class definitions.
pub trait RosterSource {
    fn students(&self, filter: &StudentFilter) -> Result<Vec<UserProfile>>;
    fn user(&self, uid: &str) -> Result<Option<UserProfile>>;
    fn users_with_role(&self, role: Role) -> Result<Vec<UserProfile>>;
    fn classes(&self) -> Result<Vec<Class>>;

    fn class(&self, class_id: &str) -> Result<Option<Class>> {
        Ok(self.classes()?.into_iter().find(|c| c.id == class_id))
    }
}

/// Source of finalized attendance sessions.
pub trait SessionSource {
    fn sessions(&self, filter: &SessionFilter) -> Result<Vec<AttendanceSession>>;
}

// ── Snapshot ──────────────────────────────────────────────────────────────────

/// In-memory copy of every user, class and session in a data directory.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub users: Vec<UserProfile>,
    pub classes: Vec<Class>,
    pub sessions: Vec<AttendanceSession>,
}

impl Snapshot {
    /// Read the snapshot rooted at `data_dir`.
    ///
    /// Missing files are treated as empty. Lines that are not valid JSON or do
    /// not describe a valid record are skipped with a warning.
    pub fn load(data_dir: &Path) -> Result<Self> {
        if !data_dir.is_dir() {
            return Err(AttendanceError::Upstream(format!(
                "data directory does not exist: {}",
                data_dir.display()
            )));
        }

        let users: Vec<UserProfile> = read_jsonl(&data_dir.join(USERS_FILE))?;
        let classes: Vec<Class> = read_jsonl(&data_dir.join(CLASSES_FILE))?;

        let session_files = find_jsonl_files(&data_dir.join(ATTENDANCE_DIR));
        let mut sessions: Vec<AttendanceSession> = Vec::new();
        for file in &session_files {
            sessions.extend(read_jsonl::<AttendanceSession>(file)?);
        }

        debug!(
            "Loaded {} users, {} classes, {} sessions from {} session files",
            users.len(),
            classes.len(),
            sessions.len(),
            session_files.len()
        );

        Ok(Self {
            users,
            classes,
            sessions,
        })
    }

    /// Resolve `uid` to an [`Actor`] with the role recorded in the snapshot.
    pub fn resolve_actor(&self, uid: &str) -> Result<Actor> {
        self.users
            .iter()
            .find(|u| u.uid == uid)
            .map(|u| Actor::new(u.uid.clone(), u.role))
            .ok_or_else(|| AttendanceError::not_found("user", uid))
    }
}

impl RosterSource for Snapshot {
    fn students(&self, filter: &StudentFilter) -> Result<Vec<UserProfile>> {
        Ok(self
            .users
            .iter()
            .filter(|u| filter.matches(u))
            .cloned()
            .collect())
    }

    fn user(&self, uid: &str) -> Result<Option<UserProfile>> {
        Ok(self.users.iter().find(|u| u.uid == uid).cloned())
    }

    fn classes(&self) -> Result<Vec<Class>> {
        Ok(self.classes.clone())
    }

    fn users_with_role(&self, role: Role) -> Result<Vec<UserProfile>> {
        Ok(self
            .users
            .iter()
            .filter(|u| u.role == role)
            .cloned()
            .collect())
    }
}

impl SessionSource for Snapshot {
    fn sessions(&self, filter: &SessionFilter) -> Result<Vec<AttendanceSession>> {
        Ok(self
            .sessions
            .iter()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect())
    }
}

// ── File helpers ──────────────────────────────────────────────────────────────

/// Find all `.jsonl` files recursively under `data_path`, sorted by path.
pub fn find_jsonl_files(data_path: &Path) -> Vec<PathBuf> {
    if !data_path.exists() {
        debug!("Session directory does not exist: {}", data_path.display());
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(data_path)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .map(|ext| ext == "jsonl")
                    .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}

/// Parse every non-blank line of `path` as a `T`.
fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        debug!("{} not found, treating as empty", path.display());
        return Ok(Vec::new());
    }

    let file = std::fs::File::open(path).map_err(|source| AttendanceError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;

    let reader = std::io::BufReader::new(file);
    let mut items = Vec::new();
    let mut skipped = 0u64;

    for (index, line_result) in reader.lines().enumerate() {
        let line = line_result.map_err(|source| AttendanceError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match serde_json::from_str::<T>(trimmed) {
            Ok(item) => items.push(item),
            Err(e) => {
                skipped += 1;
                warn!(
                    "Skipping line {} of {}: {}",
                    index + 1,
                    path.display(),
                    e
                );
            }
        }
    }

    debug!(
        "File {}: {} parsed, {} skipped",
        path.display(),
        items.len(),
        skipped
    );

    Ok(items)
}

/// Write one JSON document per line to `path`, replacing its contents.
pub fn write_jsonl<T: serde::Serialize>(path: &Path, items: &[T]) -> Result<()> {
    let lines = items
        .iter()
        .map(serde_json::to_string)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    replace_lines(path, &lines)
}

/// Replace `path` with `lines`, one per line, through a temporary file.
pub fn replace_lines(path: &Path, lines: &[String]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut out = String::new();
    for line in lines {
        out.push_str(line);
        out.push('\n');
    }
    let tmp = path.with_extension("jsonl.tmp");
    std::fs::write(&tmp, out)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
