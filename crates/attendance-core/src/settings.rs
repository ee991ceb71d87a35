use clap::{Args, CommandFactory, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the per-user directory under `$HOME`.
pub const APP_DIR_NAME: &str = ".attendance-report";

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Attendance reports and roster import for college classes
#[derive(Parser, Debug, Clone)]
#[command(
    name = "attendance",
    about = "Attendance reports and roster import for college classes",
    version
)]
pub struct Settings {
    /// Snapshot directory holding users.jsonl, classes.jsonl and attendance/
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// User id to act as (role is read from the snapshot; not remembered between runs)
    #[arg(long = "as", global = true)]
    pub actor: Option<String>,

    /// Timezone used for date windows and display (auto-detected if not specified)
    #[arg(long, global = true, default_value = "auto")]
    pub timezone: String,

    /// Output format
    #[arg(long, global = true, default_value = "table", value_parser = ["table", "json"])]
    pub format: String,

    /// JSON file overriding divisions, batches and the attendance threshold
    #[arg(long, global = true)]
    pub academic_config: Option<PathBuf>,

    /// Logging level
    #[arg(long, global = true, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Clear saved configuration
    #[arg(long, global = true)]
    pub clear: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Optional inclusive `YYYY-MM-DD` bounds.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeArgs {
    /// First day to include (YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<String>,

    /// Last day to include (YYYY-MM-DD)
    #[arg(long)]
    pub to: Option<String>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Per-student and per-session report for a class (merged across matching class records)
    ClassReport {
        class_id: String,
        #[command(flatten)]
        range: RangeArgs,
        /// Print the report as CSV instead
        #[arg(long)]
        export: bool,
    },

    /// Per-class attendance for one student
    StudentReport {
        student_id: String,
        #[command(flatten)]
        range: RangeArgs,
    },

    /// Per-class summary for one faculty member
    FacultyReport {
        faculty_id: String,
        #[command(flatten)]
        range: RangeArgs,
    },

    /// College-wide overview
    AdminReport {
        #[command(flatten)]
        range: RangeArgs,
    },

    /// Students below an attendance threshold, lowest first
    LowAttendance {
        /// Percentage threshold (defaults to the academic minimum)
        #[arg(long, value_parser = clap::value_parser!(u32).range(0..=100))]
        threshold: Option<u32>,
        /// Restrict to one class
        #[arg(long = "class")]
        class_id: Option<String>,
    },

    /// Sessions and attendance per week or month
    Trends {
        #[arg(long, default_value = "weekly", value_parser = ["weekly", "monthly"])]
        period: String,
        /// Restrict to one class
        #[arg(long = "class")]
        class_id: Option<String>,
        /// Restrict to one faculty member's sessions
        #[arg(long = "faculty")]
        faculty_id: Option<String>,
    },

    /// Check a roster CSV without importing it
    ValidateCsv {
        file: PathBuf,
        #[arg(long, value_parser = ["student", "faculty"])]
        kind: String,
    },

    /// Validate a roster CSV and create an account for every row
    ImportCsv {
        file: PathBuf,
        #[arg(long, value_parser = ["student", "faculty"])]
        kind: String,
        /// Skip the delay between rows
        #[arg(long)]
        no_pacing: bool,
    },
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Persisted last-used parameters saved to `~/.attendance-report/last_used.json`.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub academic_config: Option<PathBuf>,
}

impl LastUsedParams {
    /// Return the default path to the persisted config file.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&home_dir())
    }

    /// Return the config path rooted at `base_dir` (used for testing).
    pub fn config_path_in(base_dir: &Path) -> PathBuf {
        base_dir.join(APP_DIR_NAME).join("last_used.json")
    }

    /// Load persisted params from the default path.
    /// Returns `Default` when the file is absent or cannot be parsed.
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load persisted params from an explicit path.
    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    /// Atomically write params to an explicit path, creating parent
    /// directories if needed.
    pub fn save_to(&self, path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Delete the config file at an explicit path if it exists.
    pub fn clear_at(path: &Path) -> Result<(), std::io::Error> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments, merge with last-used params where no explicit CLI
    /// value was provided, resolve `"auto"` values, and persist the result.
    pub fn load_with_last_used() -> Self {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
        )
    }

    /// Full implementation; accepts args and an explicit config path so that
    /// tests can redirect to a temporary directory.
    pub fn load_with_last_used_impl(
        args: Vec<std::ffi::OsString>,
        config_path: &Path,
    ) -> Self {
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if settings.clear {
            let _ = LastUsedParams::clear_at(config_path);
            return Self::resolve_auto_values(settings);
        }

        let last = LastUsedParams::load_from(config_path);

        // CLI always wins. clap keys args by field name, not flag spelling.
        if settings.data_dir.is_none() {
            settings.data_dir = last.data_dir;
        }
        if settings.academic_config.is_none() {
            settings.academic_config = last.academic_config;
        }
        if !is_arg_explicitly_set(&matches, "timezone") {
            if let Some(v) = last.timezone {
                settings.timezone = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "format") {
            if let Some(v) = last.format {
                settings.format = v;
            }
        }

        settings = Self::resolve_auto_values(settings);

        let params = LastUsedParams::from(&settings);
        let _ = params.save_to(config_path);

        settings
    }

    /// Snapshot directory, defaulting to `~/.attendance-report/data`.
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| home_dir().join(APP_DIR_NAME).join("data"))
    }

    pub fn wants_json(&self) -> bool {
        self.format == "json"
    }

    /// Resolve `"auto"` sentinel values and apply the `--debug` flag.
    fn resolve_auto_values(mut settings: Settings) -> Settings {
        if settings.timezone == "auto" {
            settings.timezone = crate::time_utils::get_system_timezone();
        }
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────────

impl From<&Settings> for LastUsedParams {
    fn from(s: &Settings) -> Self {
        LastUsedParams {
            data_dir: s.data_dir.clone(),
            timezone: Some(s.timezone.clone()),
            format: Some(s.format.clone()),
            academic_config: s.academic_config.clone(),
        }
    }
}

// ── Helpers ────────────────────────────────────────────────────────────────────

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// Returns `true` when `name` was supplied explicitly on the command line
/// (not via default value or environment variable).
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
