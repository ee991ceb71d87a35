//! Account creation for bulk roster imports.
//!
//! [`AccountCreator`] is the seam to whatever system owns logins. The
//! bundled [`SnapshotAccountCreator`] records approved profiles in the local
//! snapshot so that imported students and faculty show up in reports.

use std::future::Future;
use std::path::{Path, PathBuf};

use attendance_core::error::AttendanceError;
use attendance_core::models::UserProfile;
use attendance_data::csv_import::{AccountRequest, RowKind};
use attendance_data::reader::{replace_lines, USERS_FILE};
use thiserror::Error;
use tracing::{debug, warn};

/// Failure creating a single account.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccountError {
    /// The account service is throttling requests.
    #[error("Too many requests, try again later")]
    RateLimited,

    #[error("An account already exists for {0}")]
    AlreadyExists(String),

    #[error("{0}")]
    Rejected(String),
}

impl AccountError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, AccountError::RateLimited)
    }
}

/// Creates one login account and its profile.
///
/// Returns the new account's uid. A failed call must leave nothing behind.
pub trait AccountCreator {
    fn create_account(
        &mut self,
        request: &AccountRequest,
    ) -> impl Future<Output = Result<String, AccountError>> + Send;
}

// ── SnapshotAccountCreator ────────────────────────────────────────────────────

/// One line of `users.jsonl`, kept verbatim so that records this build cannot
/// parse are written back unchanged.
#[derive(Debug, Clone)]
struct StoredLine {
    raw: String,
    profile: Option<UserProfile>,
}

impl StoredLine {
    fn parse(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            profile: serde_json::from_str(raw).ok(),
        }
    }
}

/// Writes approved profiles into the snapshot's `users.jsonl`.
///
/// A profile with the same student or employee id as the request is replaced
/// in place and keeps its uid. Every other line, including ones that do not
/// parse as a profile, is preserved. Passwords are never written.
pub struct SnapshotAccountCreator {
    path: PathBuf,
    lines: Vec<StoredLine>,
    users: Vec<UserProfile>,
}

impl SnapshotAccountCreator {
    /// Load the existing users under `data_dir`, creating the directory when
    /// it does not exist yet.
    pub fn open(data_dir: &Path) -> Result<Self, AttendanceError> {
        std::fs::create_dir_all(data_dir)?;
        let path = data_dir.join(USERS_FILE);
        let text = if path.exists() {
            std::fs::read_to_string(&path).map_err(|source| AttendanceError::FileRead {
                path: path.clone(),
                source,
            })?
        } else {
            String::new()
        };

        let lines: Vec<StoredLine> = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(StoredLine::parse)
            .collect();
        let users: Vec<UserProfile> = lines.iter().filter_map(|l| l.profile.clone()).collect();
        let opaque = lines.len() - users.len();
        if opaque > 0 {
            warn!(
                "{} lines of {} are not user profiles and will be kept as they are",
                opaque,
                path.display()
            );
        }
        debug!("Opened {} with {} existing users", path.display(), users.len());
        Ok(Self { path, lines, users })
    }

    pub fn users(&self) -> &[UserProfile] {
        &self.users
    }

    /// Index into `lines` of the profile the request replaces.
    fn position_of(&self, request: &AccountRequest) -> Option<usize> {
        let id = Some(request.external_id.as_str());
        self.lines.iter().position(|line| match (&line.profile, request.kind) {
            (Some(u), RowKind::Student) => u.is_student() && u.student_id.as_deref() == id,
            (Some(u), RowKind::Faculty) => u.is_faculty() && u.employee_id.as_deref() == id,
            (None, _) => false,
        })
    }

    fn insert(&mut self, request: &AccountRequest) -> Result<String, AccountError> {
        let existing = self.position_of(request);
        let uid = match existing.and_then(|index| self.lines[index].profile.as_ref()) {
            Some(profile) => profile.uid.clone(),
            None => format!("{}-{}", request.kind, request.external_id.to_lowercase()),
        };

        let clash = self.lines.iter().enumerate().any(|(i, line)| {
            Some(i) != existing
                && line.profile.as_ref().is_some_and(|u| {
                    u.uid == uid || (!u.email.is_empty() && u.email == request.email)
                })
        });
        if clash {
            return Err(AccountError::AlreadyExists(request.email.clone()));
        }

        let mut profile = request.profile.clone();
        profile.uid = uid.clone();
        profile.email = request.email.clone();
        profile.approved = true;
        let stored = StoredLine {
            raw: serde_json::to_string(&profile)
                .map_err(|e| AccountError::Rejected(e.to_string()))?,
            profile: Some(profile),
        };

        let mut lines = self.lines.clone();
        match existing {
            Some(index) => lines[index] = stored,
            None => lines.push(stored),
        }
        let raw: Vec<String> = lines.iter().map(|l| l.raw.clone()).collect();
        replace_lines(&self.path, &raw).map_err(|e| AccountError::Rejected(e.to_string()))?;

        self.users = lines.iter().filter_map(|l| l.profile.clone()).collect();
        self.lines = lines;
        Ok(uid)
    }
}

impl AccountCreator for SnapshotAccountCreator {
    async fn create_account(&mut self, request: &AccountRequest) -> Result<String, AccountError> {
        self.insert(request)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use attendance_core::academic::AcademicConfig;
    use attendance_data::csv_import::{FacultyRow, StudentRow};
    use attendance_data::reader::Snapshot;
    use tempfile::TempDir;

    fn student(id: &str, name: &str) -> AccountRequest {
        StudentRow {
            student_name: name.to_string(),
            studying_year: "SE".to_string(),
            roll_no: "1".to_string(),
            division: "5".to_string(),
            batch: "K5".to_string(),
            elective_subject: "DS".to_string(),
            s_id: id.to_string(),
            s_password: "secret-pw".to_string(),
        }
        .to_account_request(&AcademicConfig::default())
    }

    #[tokio::test]
    async fn test_creates_profile_without_password() {
        let dir = TempDir::new().unwrap();
        let mut creator = SnapshotAccountCreator::open(dir.path()).unwrap();

        let uid = creator.create_account(&student("ST001", "John")).await.unwrap();
        assert_eq!(uid, "student-st001");

        let written = std::fs::read_to_string(dir.path().join(USERS_FILE)).unwrap();
        assert!(!written.contains("secret-pw"));

        let snapshot = Snapshot::load(dir.path()).unwrap();
        assert_eq!(snapshot.users.len(), 1);
        assert_eq!(snapshot.users[0].email, "ST001@student.pict.edu");
        assert!(snapshot.users[0].approved);
    }

    #[tokio::test]
    async fn test_reimport_replaces_same_student() {
        let dir = TempDir::new().unwrap();
        let mut creator = SnapshotAccountCreator::open(dir.path()).unwrap();

        creator.create_account(&student("ST001", "John")).await.unwrap();
        creator.create_account(&student("ST002", "Jane")).await.unwrap();
        let uid = creator
            .create_account(&student("ST001", "John Doe"))
            .await
            .unwrap();

        assert_eq!(uid, "student-st001");
        let reopened = SnapshotAccountCreator::open(dir.path()).unwrap();
        assert_eq!(reopened.users().len(), 2);
        assert_eq!(reopened.users()[0].name, "John Doe");
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let dir = TempDir::new().unwrap();
        let mut creator = SnapshotAccountCreator::open(dir.path()).unwrap();
        let academic = AcademicConfig::default();

        let faculty = |id: &str| {
            FacultyRow {
                name: "Dr. Rao".to_string(),
                designation: "Professor".to_string(),
                email_id: "rao@pict.edu".to_string(),
                subject: "OS".to_string(),
                employee_id: id.to_string(),
                password: "pw".to_string(),
            }
            .to_account_request(&academic)
        };

        creator.create_account(&faculty("E1")).await.unwrap();
        let err = creator.create_account(&faculty("E2")).await.unwrap_err();
        assert_eq!(err, AccountError::AlreadyExists("rao@pict.edu".to_string()));
        assert_eq!(creator.users().len(), 1);
    }

    #[tokio::test]
    async fn test_unparseable_lines_survive_import() {
        let dir = TempDir::new().unwrap();
        let users = dir.path().join(USERS_FILE);
        std::fs::write(
            &users,
            concat!(
                r#"{"uid":"admin","name":"Admin","role":"admin"}"#,
                "\n",
                r#"{"uid":"p1","name":"Parent","role":"parent"}"#,
                "\n",
                "not json at all\n",
            ),
        )
        .unwrap();

        let mut creator = SnapshotAccountCreator::open(dir.path()).unwrap();
        assert_eq!(creator.users().len(), 1);
        creator.create_account(&student("ST9", "Nine")).await.unwrap();

        let written = std::fs::read_to_string(&users).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1], r#"{"uid":"p1","name":"Parent","role":"parent"}"#);
        assert_eq!(lines[2], "not json at all");
        assert!(lines[3].contains("student-st9"));
        assert_eq!(creator.users().len(), 2);
    }

    #[test]
    fn test_open_creates_missing_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("fresh").join("data");
        let creator = SnapshotAccountCreator::open(&nested).unwrap();
        assert!(creator.users().is_empty());
        assert!(nested.is_dir());
    }
}
