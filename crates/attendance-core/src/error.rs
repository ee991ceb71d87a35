use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the attendance crates.
#[derive(Error, Debug)]
pub enum AttendanceError {
    /// One or more CSV rows or columns failed validation.
    ///
    /// Every offending row/column is reported; the list is never empty.
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    /// A referenced class, student, faculty member or session does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// The acting user may not perform the requested operation.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// A failure reported by the storage or account collaborator.
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A date string did not match any recognised format.
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// A role name is not one of `admin`, `faculty`, `student`.
    #[error("Invalid role: {0}")]
    InvalidRole(String),

    /// An attendance status is not one of `present`, `absent`, `late`.
    #[error("Invalid attendance status: {0}")]
    InvalidStatus(String),

    /// A class record violates the division/batch invariant.
    #[error("Invalid class kind: {0}")]
    InvalidClassKind(String),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AttendanceError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        AttendanceError::NotFound {
            kind,
            id: id.into(),
        }
    }
}

/// Convenience alias used throughout the attendance crates.
pub type Result<T> = std::result::Result<T, AttendanceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_file_read() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = AttendanceError::FileRead {
            path: PathBuf::from("/data/users.jsonl"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("Failed to read file"));
        assert!(msg.contains("/data/users.jsonl"));
        assert!(msg.contains("no such file"));
    }

    #[test]
    fn test_error_display_validation_joins_all_messages() {
        let err = AttendanceError::Validation(vec![
            "Row 2: Missing value for sId".to_string(),
            "Row 3: Invalid division '7'. Must be 5 or 6".to_string(),
        ]);
        assert_eq!(
            err.to_string(),
            "Validation failed: Row 2: Missing value for sId; Row 3: Invalid division '7'. Must be 5 or 6"
        );
    }

    #[test]
    fn test_error_display_not_found() {
        let err = AttendanceError::not_found("Class", "cls-42");
        assert_eq!(err.to_string(), "Class not found: cls-42");
    }

    #[test]
    fn test_error_display_permission_denied() {
        let err = AttendanceError::PermissionDenied("students may only view their own report".into());
        assert_eq!(
            err.to_string(),
            "Permission denied: students may only view their own report"
        );
    }

    #[test]
    fn test_error_display_upstream() {
        let err = AttendanceError::Upstream("quota exceeded".to_string());
        assert_eq!(err.to_string(), "Upstream error: quota exceeded");
    }

    #[test]
    fn test_error_display_invalid_role() {
        let err = AttendanceError::InvalidRole("principal".to_string());
        assert_eq!(err.to_string(), "Invalid role: principal");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: AttendanceError = io_err.into();
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{invalid}").unwrap_err();
        let err: AttendanceError = json_err.into();
        assert!(err.to_string().contains("Failed to parse JSON"));
    }
}
