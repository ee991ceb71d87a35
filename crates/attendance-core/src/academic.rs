use crate::error::{AttendanceError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

// ── Shared constants ──────────────────────────────────────────────────────────

/// Minimum attendance percentage a student is expected to maintain.
pub const DEFAULT_MINIMUM_ATTENDANCE: u32 = 75;

/// Look-back window, in days, for reports generated without explicit dates
/// (roughly one semester).
pub const DEFAULT_LOOKBACK_DAYS: u32 = 120;

pub const DEFAULT_STUDENT_EMAIL_DOMAIN: &str = "student.pict.edu";
pub const DEFAULT_FACULTY_EMAIL_DOMAIN: &str = "faculty.pict.edu";

fn default_divisions() -> BTreeMap<String, Vec<String>> {
    let mut map = BTreeMap::new();
    map.insert(
        "5".to_string(),
        ["K5", "L5", "M5", "N5"].map(String::from).to_vec(),
    );
    map.insert(
        "6".to_string(),
        ["K6", "L6", "M6", "N6"].map(String::from).to_vec(),
    );
    map
}

// ── AcademicConfig ────────────────────────────────────────────────────────────

/// College-wide academic rules: which divisions exist, which batches belong
/// to each division, and the attendance threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AcademicConfig {
    /// Division code → allowed batch codes.
    pub divisions: BTreeMap<String, Vec<String>>,
    pub minimum_attendance: u32,
    pub default_lookback_days: u32,
    pub student_email_domain: String,
    pub faculty_email_domain: String,
}

impl Default for AcademicConfig {
    fn default() -> Self {
        Self {
            divisions: default_divisions(),
            minimum_attendance: DEFAULT_MINIMUM_ATTENDANCE,
            default_lookback_days: DEFAULT_LOOKBACK_DAYS,
            student_email_domain: DEFAULT_STUDENT_EMAIL_DOMAIN.to_string(),
            faculty_email_domain: DEFAULT_FACULTY_EMAIL_DOMAIN.to_string(),
        }
    }
}

impl AcademicConfig {
    /// Load a config from a JSON file. Missing keys take their defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|source| AttendanceError::FileRead {
                path: path.to_path_buf(),
                source,
            })?;
        let config: AcademicConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configs that could never validate a row.
    pub fn validate(&self) -> Result<()> {
        if self.divisions.is_empty() {
            return Err(AttendanceError::Config(
                "at least one division must be configured".to_string(),
            ));
        }
        if let Some((division, _)) = self.divisions.iter().find(|(_, b)| b.is_empty()) {
            return Err(AttendanceError::Config(format!(
                "division {division} has no batches"
            )));
        }
        if self.minimum_attendance > 100 {
            return Err(AttendanceError::Config(format!(
                "minimum attendance {} exceeds 100",
                self.minimum_attendance
            )));
        }
        Ok(())
    }

    pub fn is_valid_division(&self, division: &str) -> bool {
        self.divisions.contains_key(division)
    }

    /// Allowed batches for `division`, or `None` for an unknown division.
    pub fn batches_for(&self, division: &str) -> Option<&[String]> {
        self.divisions.get(division).map(Vec::as_slice)
    }

    pub fn is_valid_batch(&self, division: &str, batch: &str) -> bool {
        self.batches_for(division)
            .is_some_and(|batches| batches.iter().any(|b| b == batch))
    }

    /// Division codes joined for messages, e.g. `"5 or 6"`.
    pub fn division_list(&self) -> String {
        let codes: Vec<&str> = self.divisions.keys().map(String::as_str).collect();
        match codes.as_slice() {
            [] => String::new(),
            [only] => (*only).to_string(),
            [init @ .., last] => format!("{} or {}", init.join(", "), last),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
