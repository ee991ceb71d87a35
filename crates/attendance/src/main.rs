mod bootstrap;
mod render;

use std::time::Duration;

use anyhow::{bail, Context, Result};
use attendance_core::academic::AcademicConfig;
use attendance_core::models::Actor;
use attendance_core::settings::{Command, RangeArgs, Settings};
use attendance_core::time_utils::{local_date, parse_date_arg, resolve_timezone, DateWindow};
use attendance_data::access;
use attendance_data::csv_import::{CsvValidator, RowKind};
use attendance_data::reader::Snapshot;
use attendance_data::report::{ReportBuilder, TrendPeriod};
use attendance_runtime::accounts::SnapshotAccountCreator;
use attendance_runtime::importer::{ImportProgress, ImportRunner, DEFAULT_PACING};
use attendance_runtime::retry::ExponentialBackoff;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load_with_last_used();

    bootstrap::ensure_directories()?;
    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref())?;

    info!("attendance v{} starting", env!("CARGO_PKG_VERSION"));
    debug!(
        "Data dir: {}, timezone: {}, format: {}",
        settings.data_dir().display(),
        settings.timezone,
        settings.format
    );

    let output = run(&settings, Utc::now()).await?;
    print!("{output}");
    Ok(())
}

/// Execute the selected subcommand and return what should be printed.
async fn run(settings: &Settings, now: DateTime<Utc>) -> Result<String> {
    let academic = match &settings.academic_config {
        Some(path) => AcademicConfig::load_from(path)
            .with_context(|| format!("loading academic config {}", path.display()))?,
        None => AcademicConfig::default(),
    };
    let tz = resolve_timezone(&settings.timezone);

    match &settings.command {
        Command::ValidateCsv { file, kind } => {
            let kind: RowKind = kind.parse()?;
            let text = read_csv(file)?;
            let result = CsvValidator::new(&academic).validate_text(&text, kind);
            if !result.is_valid() {
                warn!("{} has {} problems", file.display(), result.errors().len());
            }
            output(settings, &result, || render::validation(&result))
        }

        Command::ImportCsv {
            file,
            kind,
            no_pacing,
        } => {
            let snapshot = load_snapshot(settings)?;
            let actor = resolve_actor(settings, &snapshot)?;
            access::ensure_admin(&actor)?;

            let kind: RowKind = kind.parse()?;
            let text = read_csv(file)?;
            let rows = CsvValidator::new(&academic)
                .validate_text(&text, kind)
                .into_rows()?;
            let requests = rows.account_requests(&academic);

            let pacing = if *no_pacing {
                Duration::ZERO
            } else {
                DEFAULT_PACING
            };
            let (tx, rx) = mpsc::channel(16);
            let reporter = tokio::spawn(log_progress(rx));

            let mut creator = SnapshotAccountCreator::open(&settings.data_dir())?;
            let runner = ImportRunner::new(ExponentialBackoff::default())
                .with_pacing(pacing)
                .with_progress(tx);
            let summary = runner.run(&mut creator, &requests).await;
            drop(runner);
            reporter.await?;

            output(settings, &summary, || render::import_summary(&summary))
        }

        command => {
            let snapshot = load_snapshot(settings)?;
            let actor = resolve_actor(settings, &snapshot)?;
            let builder = ReportBuilder::new(&snapshot, &academic, tz).at(now);
            report(settings, command, &builder, &actor, &academic, tz, now)
        }
    }
}

fn report(
    settings: &Settings,
    command: &Command,
    builder: &ReportBuilder<'_, Snapshot>,
    actor: &Actor,
    academic: &AcademicConfig,
    tz: Tz,
    now: DateTime<Utc>,
) -> Result<String> {
    match command {
        Command::ClassReport {
            class_id,
            range,
            export,
        } => {
            let window = window_for(range, tz, DateWindow::unbounded())?;
            let report = builder.class_report(actor, class_id, window)?;
            if *export {
                info!("Suggested file name: {}", report.export_file_name());
                return Ok(report.to_csv(tz, local_date(now, tz)));
            }
            output(settings, &report, || render::class_report(&report, tz))
        }
        Command::StudentReport { student_id, range } => {
            let window = window_for(range, tz, builder.default_window())?;
            let report = builder.student_report(actor, student_id, window)?;
            output(settings, &report, || render::student_report(&report, tz))
        }
        Command::FacultyReport { faculty_id, range } => {
            let window = window_for(range, tz, builder.default_window())?;
            let report = builder.faculty_report(actor, faculty_id, window)?;
            output(settings, &report, || render::faculty_report(&report, tz))
        }
        Command::AdminReport { range } => {
            let window = window_for(range, tz, builder.default_window())?;
            let report = builder.admin_report(actor, window)?;
            output(settings, &report, || render::admin_report(&report, tz))
        }
        Command::LowAttendance {
            threshold,
            class_id,
        } => {
            let entries = builder.low_attendance(
                actor,
                *threshold,
                class_id.as_deref(),
                builder.default_window(),
            )?;
            let shown = threshold.unwrap_or(academic.minimum_attendance);
            output(settings, &entries, || render::low_attendance(&entries, shown))
        }
        Command::Trends {
            period,
            class_id,
            faculty_id,
        } => {
            let period: TrendPeriod = period.parse()?;
            let report =
                builder.trends(actor, period, class_id.as_deref(), faculty_id.as_deref())?;
            output(settings, &report, || render::trends(&report))
        }
        Command::ValidateCsv { .. } | Command::ImportCsv { .. } => {
            bail!("{:?} is not a report command", command)
        }
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn output<T: Serialize>(
    settings: &Settings,
    value: &T,
    table: impl FnOnce() -> String,
) -> Result<String> {
    if settings.wants_json() {
        let mut json = serde_json::to_string_pretty(value)?;
        json.push('\n');
        Ok(json)
    } else {
        Ok(table())
    }
}

fn load_snapshot(settings: &Settings) -> Result<Snapshot> {
    let dir = settings.data_dir();
    Snapshot::load(&dir).with_context(|| format!("loading snapshot from {}", dir.display()))
}

fn resolve_actor(settings: &Settings, snapshot: &Snapshot) -> Result<Actor> {
    let uid = settings
        .actor
        .as_deref()
        .context("no acting user; pass --as <uid>")?;
    Ok(snapshot.resolve_actor(uid)?)
}

fn read_csv(path: &std::path::Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

/// `--from`/`--to` when either is given, otherwise `default`.
fn window_for(range: &RangeArgs, tz: Tz, default: DateWindow) -> Result<DateWindow> {
    if range.from.is_none() && range.to.is_none() {
        return Ok(default);
    }
    let from = range.from.as_deref().map(parse_date_arg).transpose()?;
    let to = range.to.as_deref().map(parse_date_arg).transpose()?;
    Ok(DateWindow::from_dates(from, to, tz)?)
}

async fn log_progress(mut rx: mpsc::Receiver<ImportProgress>) {
    while let Some(event) = rx.recv().await {
        match event {
            ImportProgress::Started { total } => info!("Importing {} rows", total),
            ImportProgress::Retrying {
                row,
                external_id,
                attempt,
                delay,
            } => warn!(
                "Row {} ({}): rate limited on attempt {}, waiting {:?}",
                row, external_id, attempt, delay
            ),
            ImportProgress::Created {
                row, external_id, ..
            } => info!("Row {}: created {}", row, external_id),
            ImportProgress::Failed { row, detail } => warn!("Row {}: {}", row, detail),
            ImportProgress::Finished(summary) => info!(
                "Done: {} created, {} failed",
                summary.success, summary.errors
            ),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
