//! Roster CSV parsing and validation.
//!
//! Parsing never fails: a file that is not a CSV simply yields no rows, and
//! validation reports that. Validation checks every row and column and
//! returns every problem at once; whether to import anyway is the caller's
//! decision.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use attendance_core::academic::AcademicConfig;
use attendance_core::error::{AttendanceError, Result};
use attendance_core::models::{Role, UserProfile};
use regex::Regex;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use tracing::debug;

pub const STUDENT_COLUMNS: [&str; 8] = [
    "studentName",
    "studyingYear",
    "rollNo",
    "division",
    "batch",
    "electiveSubject",
    "sId",
    "sPassword",
];

pub const FACULTY_COLUMNS: [&str; 6] = [
    "name",
    "designation",
    "emailID",
    "subject",
    "E_ID",
    "E_password",
];

/// Department recorded on imported students.
pub const DEFAULT_DEPARTMENT: &str = "Computer Engineering";
pub const DEFAULT_DESIGNATION: &str = "Professor";

const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";

// ── RowKind ───────────────────────────────────────────────────────────────────

/// Which roster a CSV file describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RowKind {
    Student,
    Faculty,
}

impl RowKind {
    pub fn required_columns(&self) -> &'static [&'static str] {
        match self {
            RowKind::Student => &STUDENT_COLUMNS,
            RowKind::Faculty => &FACULTY_COLUMNS,
        }
    }

    /// `"Student"` / `"Faculty"`, as used in import error details.
    pub fn label(&self) -> &'static str {
        match self {
            RowKind::Student => "Student",
            RowKind::Faculty => "Faculty",
        }
    }

    pub fn role(&self) -> Role {
        match self {
            RowKind::Student => Role::Student,
            RowKind::Faculty => Role::Faculty,
        }
    }
}

impl FromStr for RowKind {
    type Err = AttendanceError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "student" => Ok(RowKind::Student),
            "faculty" => Ok(RowKind::Faculty),
            other => Err(AttendanceError::Config(format!(
                "unknown row kind '{other}', expected student or faculty"
            ))),
        }
    }
}

impl fmt::Display for RowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RowKind::Student => "student",
            RowKind::Faculty => "faculty",
        })
    }
}

// ── Parsing ───────────────────────────────────────────────────────────────────

/// One data row, keyed by header.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CsvRow {
    fields: BTreeMap<String, String>,
}

impl CsvRow {
    /// Value of `column`, or `""` when absent.
    pub fn get(&self, column: &str) -> &str {
        self.fields.get(column).map(String::as_str).unwrap_or("")
    }

    fn is_blank(&self) -> bool {
        self.fields.values().all(|v| v.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCsv {
    pub separator: char,
    pub headers: Vec<String>,
    pub rows: Vec<CsvRow>,
}

/// Split delimited text into rows.
///
/// The separator is `;` when the header line has more `;`-separated fields
/// than `,`-separated ones, otherwise `,`. A leading byte-order mark is
/// removed, quote characters are stripped from headers and from both ends of
/// values, and blank lines and all-empty rows are dropped. Fewer than two
/// non-blank lines yield no rows.
pub fn parse_csv(text: &str) -> ParsedCsv {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let normalised = text.replace("\r\n", "\n").replace('\r', "\n");
    let lines: Vec<&str> = normalised
        .split('\n')
        .filter(|line| !line.trim().is_empty())
        .collect();

    let Some(header_line) = lines.first() else {
        return ParsedCsv {
            separator: ',',
            headers: Vec::new(),
            rows: Vec::new(),
        };
    };

    let separator = detect_separator(header_line);
    let headers: Vec<String> = header_line
        .split(separator)
        .map(|h| h.trim().replace(['"', '\''], ""))
        .collect();

    let rows: Vec<CsvRow> = lines
        .iter()
        .skip(1)
        .map(|line| {
            let values: Vec<&str> = line.split(separator).map(clean_value).collect();
            let fields = headers
                .iter()
                .enumerate()
                .map(|(i, h)| (h.clone(), values.get(i).copied().unwrap_or("").to_string()))
                .collect();
            CsvRow { fields }
        })
        .filter(|row| !row.is_blank())
        .collect();

    debug!(
        "Parsed CSV with separator '{}': {} columns, {} rows",
        separator,
        headers.len(),
        rows.len()
    );

    ParsedCsv {
        separator,
        headers,
        rows,
    }
}

fn detect_separator(header: &str) -> char {
    let semicolons = header.split(';').count();
    let commas = header.split(',').count();
    if semicolons > commas {
        ';'
    } else {
        ','
    }
}

/// Trim and drop one quote character from each end.
fn clean_value(raw: &str) -> &str {
    let v = raw.trim();
    let v = v.strip_prefix(['"', '\'']).unwrap_or(v);
    v.strip_suffix(['"', '\'']).unwrap_or(v)
}

// ── Typed rows ────────────────────────────────────────────────────────────────

/// A validated student row. Passwords are never serialised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudentRow {
    #[serde(rename = "studentName")]
    pub student_name: String,
    #[serde(rename = "studyingYear")]
    pub studying_year: String,
    #[serde(rename = "rollNo")]
    pub roll_no: String,
    pub division: String,
    pub batch: String,
    #[serde(rename = "electiveSubject")]
    pub elective_subject: String,
    #[serde(rename = "sId")]
    pub s_id: String,
    #[serde(skip)]
    pub s_password: String,
}

impl StudentRow {
    fn from_row(row: &CsvRow) -> Self {
        let get = |c: &str| row.get(c).trim().to_string();
        Self {
            student_name: get("studentName"),
            studying_year: get("studyingYear"),
            roll_no: get("rollNo"),
            division: get("division"),
            batch: get("batch"),
            elective_subject: get("electiveSubject"),
            s_id: get("sId"),
            s_password: row.get("sPassword").to_string(),
        }
    }

    /// Login email derived from the student id.
    pub fn email(&self, academic: &AcademicConfig) -> String {
        format!("{}@{}", self.s_id, academic.student_email_domain)
    }

    pub fn to_account_request(&self, academic: &AcademicConfig) -> AccountRequest {
        let email = self.email(academic);
        let mut profile = UserProfile::new("", self.student_name.clone(), Role::Student);
        profile.email = email.clone();
        profile.student_id = Some(self.s_id.clone());
        profile.year = Some(self.studying_year.clone());
        profile.roll_no = Some(self.roll_no.clone());
        profile.division = Some(self.division.clone());
        profile.batch = Some(self.batch.clone());
        profile.elective_subject = Some(self.elective_subject.clone());
        profile.department = Some(DEFAULT_DEPARTMENT.to_string());

        AccountRequest {
            kind: RowKind::Student,
            external_id: self.s_id.clone(),
            email,
            password: self.s_password.clone(),
            profile,
        }
    }
}

/// A validated faculty row. Passwords are never serialised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacultyRow {
    pub name: String,
    pub designation: String,
    #[serde(rename = "emailID")]
    pub email_id: String,
    pub subject: String,
    #[serde(rename = "E_ID")]
    pub employee_id: String,
    #[serde(skip)]
    pub password: String,
}

impl FacultyRow {
    fn from_row(row: &CsvRow) -> Self {
        let get = |c: &str| row.get(c).trim().to_string();
        Self {
            name: get("name"),
            designation: get("designation"),
            email_id: get("emailID"),
            subject: get("subject"),
            employee_id: get("E_ID"),
            password: row.get("E_password").to_string(),
        }
    }

    /// The supplied email, or one derived from the employee id.
    ///
    /// Validated CSV rows always carry `emailID`, so the derived address
    /// only applies to rows built in code.
    pub fn email(&self, academic: &AcademicConfig) -> String {
        if self.email_id.is_empty() {
            format!("{}@{}", self.employee_id, academic.faculty_email_domain)
        } else {
            self.email_id.clone()
        }
    }

    pub fn to_account_request(&self, academic: &AcademicConfig) -> AccountRequest {
        let email = self.email(academic);
        let designation = if self.designation.is_empty() {
            DEFAULT_DESIGNATION.to_string()
        } else {
            self.designation.clone()
        };
        let mut profile = UserProfile::new("", self.name.clone(), Role::Faculty);
        profile.email = email.clone();
        profile.employee_id = Some(self.employee_id.clone());
        profile.designation = Some(designation);
        profile.subject = Some(self.subject.clone());

        AccountRequest {
            kind: RowKind::Faculty,
            external_id: self.employee_id.clone(),
            email,
            password: self.password.clone(),
            profile,
        }
    }
}

/// Everything the account-creation step needs for one row.
///
/// `profile.uid` is empty until the account exists.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountRequest {
    pub kind: RowKind,
    /// `sId` or `E_ID`.
    pub external_id: String,
    pub email: String,
    pub password: String,
    pub profile: UserProfile,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidatedRows {
    Students(Vec<StudentRow>),
    Faculty(Vec<FacultyRow>),
}

impl ValidatedRows {
    pub fn len(&self) -> usize {
        match self {
            ValidatedRows::Students(rows) => rows.len(),
            ValidatedRows::Faculty(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> RowKind {
        match self {
            ValidatedRows::Students(_) => RowKind::Student,
            ValidatedRows::Faculty(_) => RowKind::Faculty,
        }
    }

    pub fn account_requests(&self, academic: &AcademicConfig) -> Vec<AccountRequest> {
        match self {
            ValidatedRows::Students(rows) => rows
                .iter()
                .map(|r| r.to_account_request(academic))
                .collect(),
            ValidatedRows::Faculty(rows) => rows
                .iter()
                .map(|r| r.to_account_request(academic))
                .collect(),
        }
    }
}

// ── Validation ────────────────────────────────────────────────────────────────

/// Outcome of validating a roster CSV.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CsvValidation {
    Invalid { errors: Vec<String> },
    Valid(ValidatedRows),
}

impl CsvValidation {
    pub fn is_valid(&self) -> bool {
        matches!(self, CsvValidation::Valid(_))
    }

    pub fn errors(&self) -> &[String] {
        match self {
            CsvValidation::Invalid { errors } => errors,
            CsvValidation::Valid(_) => &[],
        }
    }

    /// The parsed rows, or [`AttendanceError::Validation`] listing every error.
    pub fn into_rows(self) -> Result<ValidatedRows> {
        match self {
            CsvValidation::Valid(rows) => Ok(rows),
            CsvValidation::Invalid { errors } => Err(AttendanceError::Validation(errors)),
        }
    }
}

/// `{"valid": false, "errors": [...]}` or `{"valid": true, "kind": ..., "rows": [...]}`.
impl Serialize for CsvValidation {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            CsvValidation::Invalid { errors } => {
                let mut state = serializer.serialize_struct("CsvValidation", 2)?;
                state.serialize_field("valid", &false)?;
                state.serialize_field("errors", errors)?;
                state.end()
            }
            CsvValidation::Valid(rows) => {
                let mut state = serializer.serialize_struct("CsvValidation", 3)?;
                state.serialize_field("valid", &true)?;
                state.serialize_field("kind", &rows.kind())?;
                match rows {
                    ValidatedRows::Students(r) => state.serialize_field("rows", r)?,
                    ValidatedRows::Faculty(r) => state.serialize_field("rows", r)?,
                }
                state.end()
            }
        }
    }
}

/// Validates parsed rows against the fixed column sets and the academic
/// division/batch rules.
pub struct CsvValidator<'a> {
    academic: &'a AcademicConfig,
    email: Regex,
}

impl<'a> CsvValidator<'a> {
    pub fn new(academic: &'a AcademicConfig) -> Self {
        Self {
            academic,
            email: Regex::new(EMAIL_PATTERN).expect("regex is valid"),
        }
    }

    /// Parse and validate `text` in one step.
    pub fn validate_text(&self, text: &str, kind: RowKind) -> CsvValidation {
        self.validate(&parse_csv(text), kind)
    }

    pub fn validate(&self, parsed: &ParsedCsv, kind: RowKind) -> CsvValidation {
        if parsed.rows.is_empty() {
            return CsvValidation::Invalid {
                errors: vec!["CSV file is empty or invalid".to_string()],
            };
        }

        let mut errors = Vec::new();

        let missing: Vec<&str> = kind
            .required_columns()
            .iter()
            .copied()
            .filter(|c| !parsed.headers.iter().any(|h| h == c))
            .collect();
        if !missing.is_empty() {
            errors.push(format!("Missing required columns: {}", missing.join(", ")));
        }

        for (index, row) in parsed.rows.iter().enumerate() {
            let line = index + 2;
            for column in kind.required_columns() {
                if row.get(column).trim().is_empty() {
                    errors.push(format!("Row {line}: Missing value for {column}"));
                }
            }
            match kind {
                RowKind::Student => self.check_grouping(row, line, &mut errors),
                RowKind::Faculty => self.check_email(row, line, &mut errors),
            }
        }

        if !errors.is_empty() {
            debug!("CSV validation found {} problems", errors.len());
            return CsvValidation::Invalid { errors };
        }

        CsvValidation::Valid(match kind {
            RowKind::Student => {
                ValidatedRows::Students(parsed.rows.iter().map(StudentRow::from_row).collect())
            }
            RowKind::Faculty => {
                ValidatedRows::Faculty(parsed.rows.iter().map(FacultyRow::from_row).collect())
            }
        })
    }

    fn check_grouping(&self, row: &CsvRow, line: usize, errors: &mut Vec<String>) {
        let division = row.get("division").trim();
        let batch = row.get("batch").trim();
        if division.is_empty() || batch.is_empty() {
            return;
        }

        match self.academic.batches_for(division) {
            None => errors.push(format!(
                "Row {line}: Invalid division '{division}'. Must be {}",
                self.academic.division_list()
            )),
            Some(batches) if !batches.iter().any(|b| b == batch) => errors.push(format!(
                "Row {line}: Invalid batch '{batch}' for division {division}. \
                 Valid batches for division {division}: {}",
                batches.join(", ")
            )),
            Some(_) => {}
        }
    }

    fn check_email(&self, row: &CsvRow, line: usize, errors: &mut Vec<String>) {
        let email = row.get("emailID").trim();
        if !email.is_empty() && !self.email.is_match(email) {
            errors.push(format!("Row {line}: Invalid email format for emailID"));
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const STUDENT_HEADER: &str =
        "studentName,studyingYear,rollNo,division,batch,electiveSubject,sId,sPassword";
    const FACULTY_HEADER: &str = "name,designation,emailID,subject,E_ID,E_password";

    fn validator_check(text: &str, kind: RowKind) -> CsvValidation {
        let academic = AcademicConfig::default();
        CsvValidator::new(&academic).validate_text(text, kind)
    }

    // ── parse_csv ─────────────────────────────────────────────────────────────

    #[test]
    fn test_parse_comma_separated() {
        let text = format!(
            "{STUDENT_HEADER}\nJohn Doe,Second Year,101,5,K5,Data Structures,ST001,pass123\n"
        );
        let parsed = parse_csv(&text);
        assert_eq!(parsed.separator, ',');
        assert_eq!(parsed.headers.len(), 8);
        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(parsed.rows[0].get("studentName"), "John Doe");
        assert_eq!(parsed.rows[0].get("sPassword"), "pass123");
    }

    #[test]
    fn test_parse_semicolon_separated() {
        let text = "studentName;studyingYear;rollNo;division;batch;electiveSubject;sId;sPassword\n\
                    Doe, John;SE;101;5;K5;DS;ST001;pw";
        let parsed = parse_csv(text);
        assert_eq!(parsed.separator, ';');
        assert_eq!(parsed.rows[0].get("studentName"), "Doe, John");
        assert_eq!(parsed.rows[0].get("sId"), "ST001");
    }

    #[test]
    fn test_parse_strips_bom_quotes_and_blank_rows() {
        let text = "\u{feff}\"name\",'subject'\r\n\"Dr. Rao\",'OS'\r\n\r\n,\r\n  \r\nDr. Iyer,CN\r\n";
        let parsed = parse_csv(text);
        assert_eq!(parsed.headers, vec!["name", "subject"]);
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rows[0].get("name"), "Dr. Rao");
        assert_eq!(parsed.rows[0].get("subject"), "OS");
        assert_eq!(parsed.rows[1].get("name"), "Dr. Iyer");
    }

    #[test]
    fn test_parse_short_rows_padded_with_empty() {
        let parsed = parse_csv("a,b,c\n1");
        assert_eq!(parsed.rows[0].get("a"), "1");
        assert_eq!(parsed.rows[0].get("c"), "");
        assert_eq!(parsed.rows[0].get("missing"), "");
    }

    #[test]
    fn test_parse_header_only_has_no_rows() {
        assert!(parse_csv(STUDENT_HEADER).rows.is_empty());
        assert!(parse_csv("").rows.is_empty());
    }

    // ── Student validation ────────────────────────────────────────────────────

    #[test]
    fn test_valid_student_csv_round_trips_fields() {
        let text = format!(
            "{STUDENT_HEADER}\n\
             John Doe,Second Year,101,5,K5,Data Structures,ST001,pass123\n\
             Jane Smith,Third Year,102,6,L6,Machine Learning,ST002,pass456\n"
        );
        let result = validator_check(&text, RowKind::Student);
        let ValidatedRows::Students(rows) = result.into_rows().unwrap() else {
            panic!("expected student rows");
        };
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[1],
            StudentRow {
                student_name: "Jane Smith".into(),
                studying_year: "Third Year".into(),
                roll_no: "102".into(),
                division: "6".into(),
                batch: "L6".into(),
                elective_subject: "Machine Learning".into(),
                s_id: "ST002".into(),
                s_password: "pass456".into(),
            }
        );
    }

    #[test]
    fn test_batch_must_belong_to_division() {
        let text = format!(
            "{STUDENT_HEADER}\n\
             A,SE,1,5,K5,DS,ST1,pw\n\
             B,SE,2,5,K6,DS,ST2,pw\n"
        );
        let result = validator_check(&text, RowKind::Student);
        assert_eq!(
            result.errors(),
            &["Row 3: Invalid batch 'K6' for division 5. Valid batches for division 5: K5, L5, M5, N5"
                .to_string()]
        );
    }

    #[test]
    fn test_invalid_division() {
        let text = format!("{STUDENT_HEADER}\nA,SE,1,7,K7,DS,ST1,pw\n");
        let result = validator_check(&text, RowKind::Student);
        assert_eq!(
            result.errors(),
            &["Row 2: Invalid division '7'. Must be 5 or 6".to_string()]
        );
    }

    #[test]
    fn test_every_problem_reported() {
        let text = "studentName,rollNo,division,batch,sId,sPassword\n\
                    ,1,5,K5,ST1,pw\n\
                    B,2,6,K5,,pw\n";
        let result = validator_check(text, RowKind::Student);
        assert!(!result.is_valid());
        assert_eq!(
            result.errors(),
            &[
                "Missing required columns: studyingYear, electiveSubject".to_string(),
                "Row 2: Missing value for studentName".to_string(),
                "Row 2: Missing value for studyingYear".to_string(),
                "Row 2: Missing value for electiveSubject".to_string(),
                "Row 3: Missing value for studyingYear".to_string(),
                "Row 3: Missing value for electiveSubject".to_string(),
                "Row 3: Missing value for sId".to_string(),
                "Row 3: Invalid batch 'K5' for division 6. Valid batches for division 6: K6, L6, M6, N6"
                    .to_string(),
            ]
        );
    }

    #[test]
    fn test_empty_csv_is_invalid() {
        let result = validator_check("", RowKind::Student);
        assert_eq!(result.errors(), &["CSV file is empty or invalid".to_string()]);
        let err = result.into_rows().unwrap_err();
        assert!(matches!(err, AttendanceError::Validation(ref e) if e.len() == 1));
    }

    #[test]
    fn test_custom_divisions_change_messages() {
        let mut academic = AcademicConfig::default();
        academic.divisions.insert("7".to_string(), vec!["K7".to_string()]);
        let validator = CsvValidator::new(&academic);

        let ok = format!("{STUDENT_HEADER}\nA,SE,1,7,K7,DS,ST1,pw\n");
        assert!(validator.validate_text(&ok, RowKind::Student).is_valid());

        let bad = format!("{STUDENT_HEADER}\nA,SE,1,8,K8,DS,ST1,pw\n");
        assert_eq!(
            validator.validate_text(&bad, RowKind::Student).errors(),
            &["Row 2: Invalid division '8'. Must be 5, 6 or 7".to_string()]
        );
    }

    // ── Faculty validation ────────────────────────────────────────────────────

    #[test]
    fn test_valid_faculty_csv() {
        let text = format!(
            "{FACULTY_HEADER}\nDr. John Smith,Professor,john.smith@pict.edu,Computer Science,EMP001,pass123\n"
        );
        let rows = validator_check(&text, RowKind::Faculty).into_rows().unwrap();
        assert_eq!(rows.kind(), RowKind::Faculty);
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_faculty_email_format() {
        let text = format!(
            "{FACULTY_HEADER}\n\
             A,Prof,not-an-email,OS,E1,pw\n\
             B,Prof,b@pict.edu,OS,E2,pw\n\
             C,Prof,c @pict.edu,OS,E3,pw\n"
        );
        let result = validator_check(&text, RowKind::Faculty);
        assert_eq!(
            result.errors(),
            &[
                "Row 2: Invalid email format for emailID".to_string(),
                "Row 4: Invalid email format for emailID".to_string(),
            ]
        );
    }

    // ── Account requests ──────────────────────────────────────────────────────

    #[test]
    fn test_student_account_request() {
        let academic = AcademicConfig::default();
        let text = format!("{STUDENT_HEADER}\nJohn Doe,SE,101,5,K5,DS,ST001,pass123\n");
        let rows = CsvValidator::new(&academic)
            .validate_text(&text, RowKind::Student)
            .into_rows()
            .unwrap();
        let requests = rows.account_requests(&academic);

        assert_eq!(requests.len(), 1);
        let req = &requests[0];
        assert_eq!(req.email, "ST001@student.pict.edu");
        assert_eq!(req.password, "pass123");
        assert_eq!(req.external_id, "ST001");
        assert_eq!(req.profile.role, Role::Student);
        assert_eq!(req.profile.batch.as_deref(), Some("K5"));
        assert_eq!(req.profile.department.as_deref(), Some(DEFAULT_DEPARTMENT));
        assert!(req.profile.approved);
    }

    #[test]
    fn test_faculty_csv_requires_email() {
        let text = "name,designation,emailID,subject,E_ID,E_password\n\
                    Dr. Rao,Professor,,OS,EMP9,pw\n";
        let result = validator_check(text, RowKind::Faculty);
        assert!(!result.is_valid());
        assert_eq!(result.errors(), ["Row 2: Missing value for emailID".to_string()]);
    }

    #[test]
    fn test_faculty_email_fallback() {
        let academic = AcademicConfig::default();
        let row = FacultyRow {
            name: "Dr. Rao".into(),
            designation: String::new(),
            email_id: String::new(),
            subject: "OS".into(),
            employee_id: "EMP9".into(),
            password: "pw".into(),
        };
        let req = row.to_account_request(&academic);
        assert_eq!(req.email, "EMP9@faculty.pict.edu");
        assert_eq!(req.profile.designation.as_deref(), Some(DEFAULT_DESIGNATION));
        assert_eq!(req.kind.label(), "Faculty");
    }

    // ── Serialisation ─────────────────────────────────────────────────────────

    #[test]
    fn test_validation_json_shape_hides_passwords() {
        let text = format!("{STUDENT_HEADER}\nJohn,SE,101,5,K5,DS,ST001,secret\n");
        let json = serde_json::to_value(validator_check(&text, RowKind::Student)).unwrap();
        assert_eq!(json["valid"], true);
        assert_eq!(json["kind"], "student");
        assert_eq!(json["rows"][0]["sId"], "ST001");
        assert!(json["rows"][0].get("sPassword").is_none());
        assert!(!json.to_string().contains("secret"));

        let json = serde_json::to_value(validator_check("", RowKind::Faculty)).unwrap();
        assert_eq!(json["valid"], false);
        assert_eq!(json["errors"][0], "CSV file is empty or invalid");
    }

    #[test]
    fn test_row_kind_from_str() {
        assert_eq!("Student".parse::<RowKind>().unwrap(), RowKind::Student);
        assert_eq!("faculty".parse::<RowKind>().unwrap(), RowKind::Faculty);
        assert!("parent".parse::<RowKind>().is_err());
    }
}
