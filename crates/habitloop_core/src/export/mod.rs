//! Habit data export.
//!
//! # Responsibility
//! - Resolve the directory exported files are written to.
//! - Write habits and their entries as CSV.
//! - Wrap an export run as a background task with a single completion.
//!
//! # Invariants
//! - An export failure reaches the completion as an absent filename, never
//!   as a panic or an error value.

use crate::model::habit::{Entry, Habit};
use crate::model::timestamp::Timestamp;
use crate::task::Task;
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Supplies output locations for exported data.
pub trait DirFinder: Send + Sync {
    fn csv_output_dir(&self) -> PathBuf;
}

/// `DirFinder` that always answers the same directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedDirFinder {
    dir: PathBuf,
}

impl FixedDirFinder {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl DirFinder for FixedDirFinder {
    fn csv_output_dir(&self) -> PathBuf {
        self.dir.clone()
    }
}

#[derive(Debug)]
pub enum ExportError {
    Io(std::io::Error),
    Csv(csv::Error),
}

impl Display for ExportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "export i/o failure: {err}"),
            Self::Csv(err) => write!(f, "csv encoding failure: {err}"),
        }
    }
}

impl Error for ExportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Csv(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for ExportError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<csv::Error> for ExportError {
    fn from(value: csv::Error) -> Self {
        Self::Csv(value)
    }
}

/// Produces an export file from a habit snapshot.
pub trait HabitsExporter: Send + Sync {
    /// Writes `habits` under `output_dir` and returns the produced file path.
    fn export(&self, habits: &[Habit], output_dir: &Path) -> Result<String, ExportError>;
}

/// Writes one CSV file with a row per recorded day.
///
/// Columns: `Position,Habit,Unit,Date,Value`. Numerical values are written
/// in display units; yes/no values as `YES`, `YES_AUTO`, `NO` or `SKIP`.
/// Habits without entries get a single row with empty date and value.
#[derive(Debug, Clone, Default)]
pub struct CsvHabitsExporter {
    date: Option<Timestamp>,
}

impl CsvHabitsExporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fixes the date used in the file name (defaults to today).
    pub fn with_date(date: Timestamp) -> Self {
        Self { date: Some(date) }
    }

    fn file_name(&self) -> String {
        let date = self.date.unwrap_or_else(Timestamp::today);
        format!("Habits CSV {date}.csv")
    }
}

impl HabitsExporter for CsvHabitsExporter {
    fn export(&self, habits: &[Habit], output_dir: &Path) -> Result<String, ExportError> {
        std::fs::create_dir_all(output_dir)?;
        let path = output_dir.join(self.file_name());

        let mut writer = csv::Writer::from_path(&path)?;
        writer.write_record(["Position", "Habit", "Unit", "Date", "Value"])?;
        for habit in habits {
            let position = habit.position.to_string();
            if habit.entries.is_empty() {
                writer.write_record([
                    position.as_str(),
                    habit.name.as_str(),
                    habit.unit.as_str(),
                    "",
                    "",
                ])?;
                continue;
            }
            for entry in habit.entries.iter() {
                writer.write_record([
                    position.as_str(),
                    habit.name.as_str(),
                    habit.unit.as_str(),
                    entry.timestamp.to_string().as_str(),
                    format_value(habit, entry.value).as_str(),
                ])?;
            }
        }
        writer.flush()?;

        Ok(path.to_string_lossy().into_owned())
    }
}

fn format_value(habit: &Habit, value: i32) -> String {
    if habit.is_numerical {
        return format!("{:.3}", f64::from(value) / 1000.0);
    }
    match value {
        Entry::YES_MANUAL => "YES".to_string(),
        Entry::YES_AUTO => "YES_AUTO".to_string(),
        Entry::NO => "NO".to_string(),
        Entry::SKIP => "SKIP".to_string(),
        Entry::UNKNOWN => String::new(),
        other => other.to_string(),
    }
}

/// Completion of an export run: the produced file, or `None` on failure.
pub type ExportCallback = Box<dyn FnOnce(Option<String>) + Send>;

/// Background export of a habit snapshot.
pub struct ExportCsvTask {
    exporter: Arc<dyn HabitsExporter>,
    habits: Vec<Habit>,
    output_dir: PathBuf,
    filename: Option<String>,
    on_finished: ExportCallback,
}

impl ExportCsvTask {
    pub fn new(
        exporter: Arc<dyn HabitsExporter>,
        habits: Vec<Habit>,
        output_dir: PathBuf,
        on_finished: ExportCallback,
    ) -> Self {
        Self {
            exporter,
            habits,
            output_dir,
            filename: None,
            on_finished,
        }
    }
}

impl Task for ExportCsvTask {
    fn name(&self) -> &'static str {
        "export_csv"
    }

    fn do_in_background(&mut self) {
        match self.exporter.export(&self.habits, &self.output_dir) {
            Ok(filename) => {
                info!(
                    "event=habit_export module=export status=ok habit_count={}",
                    self.habits.len()
                );
                self.filename = Some(filename);
            }
            Err(err) => {
                error!("event=habit_export module=export status=error error={err}");
                self.filename = None;
            }
        }
    }

    fn on_post_execute(self: Box<Self>) {
        let task = *self;
        (task.on_finished)(task.filename);
    }
}

#[cfg(test)]
mod tests {
    use super::{CsvHabitsExporter, DirFinder, FixedDirFinder, HabitsExporter};
    use crate::model::habit::{Entry, Habit};
    use crate::model::timestamp::Timestamp;
    use std::path::Path;

    #[test]
    fn writes_one_row_per_entry_with_display_values() {
        let dir = tempfile::tempdir().expect("temp dir");
        let day = Timestamp::from_unix_millis(0);

        let mut run = Habit::numerical("Run", "km");
        run.entries.record(day, 5_250);
        let mut read = Habit::new("Read, daily");
        read.position = 1;
        read.entries.record(day, Entry::YES_MANUAL);
        read.entries.record(day.plus_days(1), Entry::SKIP);
        let mut idle = Habit::new("Idle");
        idle.position = 2;

        let exporter = CsvHabitsExporter::with_date(day);
        let file = exporter
            .export(&[run, read, idle], dir.path())
            .expect("export");
        assert!(file.ends_with("Habits CSV 1970-01-01.csv"));

        let content = std::fs::read_to_string(&file).expect("read back");
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Position,Habit,Unit,Date,Value",
                "0,Run,km,1970-01-01,5.250",
                "1,\"Read, daily\",,1970-01-01,YES",
                "1,\"Read, daily\",,1970-01-02,SKIP",
                "2,Idle,,,",
            ]
        );
    }

    #[test]
    fn creates_missing_output_directory() {
        let dir = tempfile::tempdir().expect("temp dir");
        let nested = dir.path().join("exports").join("csv");
        let finder = FixedDirFinder::new(&nested);
        let file = CsvHabitsExporter::new()
            .export(&[], &finder.csv_output_dir())
            .expect("export");
        assert!(Path::new(&file).starts_with(&nested));
    }

    #[test]
    fn unwritable_output_dir_is_an_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"x").expect("write blocker");
        assert!(CsvHabitsExporter::new().export(&[], &blocker).is_err());
    }
}
