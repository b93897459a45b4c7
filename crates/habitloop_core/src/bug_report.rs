//! Diagnostic report generation.
//!
//! # Responsibility
//! - Dump a plain-text diagnostic report to storage.
//! - Read the report back for the "send to developer" flow.
//!
//! # Invariants
//! - Dumping never fails loudly; its last failure is kept as internal state.
//! - Reading back fails while that failure is set.
//! - The report carries metadata and habit counts only, never habit names.

use crate::logging::{build_mode, current_log_file, logging_status};
use crate::model::timestamp::Timestamp;
use crate::repo::habit_list::HabitList;
use log::{info, warn};
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

const REPORT_FILE_NAME: &str = "bug_report.txt";
const MAX_LOG_TAIL_LINES: usize = 200;

/// Diagnostic dump producer.
pub trait BugReporter: Send + Sync {
    /// Writes a fresh report to storage; failures are recorded internally.
    fn dump_bug_report_to_file(&self);

    /// Reads the last dumped report back.
    fn bug_report(&self) -> std::io::Result<String>;
}

/// Bug reporter writing `bug_report.txt` into a report directory.
pub struct FileBugReporter {
    report_dir: PathBuf,
    habits: Arc<dyn HabitList>,
    last_dump_error: Mutex<Option<String>>,
}

impl FileBugReporter {
    pub fn new(report_dir: impl Into<PathBuf>, habits: Arc<dyn HabitList>) -> Self {
        Self {
            report_dir: report_dir.into(),
            habits,
            last_dump_error: Mutex::new(None),
        }
    }

    pub fn report_path(&self) -> PathBuf {
        self.report_dir.join(REPORT_FILE_NAME)
    }

    /// Failure of the most recent dump, if it failed.
    pub fn last_dump_error(&self) -> Option<String> {
        self.last_dump_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Builds the report text without touching storage.
    pub fn generate(&self) -> String {
        let mut report = String::new();
        let _ = writeln!(report, "HabitLoop bug report");
        let _ = writeln!(report, "generated: {}", Timestamp::today());
        let _ = writeln!(report, "core_version: {}", crate::core_version());
        let _ = writeln!(
            report,
            "platform: {} {}",
            std::env::consts::OS,
            std::env::consts::ARCH
        );
        let _ = writeln!(report, "build_mode: {}", build_mode());
        match logging_status() {
            Some((level, _)) => {
                let _ = writeln!(report, "log_level: {level}");
            }
            None => {
                let _ = writeln!(report, "log_level: inactive");
            }
        }

        let _ = writeln!(report, "\n--- habits ---");
        match self.habits.habits() {
            Ok(habits) => {
                let numerical = habits.iter().filter(|h| h.is_numerical).count();
                let entries: usize = habits.iter().map(|h| h.entries.len()).sum();
                let _ = writeln!(report, "habit_count: {}", habits.len());
                let _ = writeln!(report, "numerical_count: {numerical}");
                let _ = writeln!(report, "entry_count: {entries}");
            }
            Err(err) => {
                let _ = writeln!(report, "habit_list_error: {err}");
            }
        }

        let _ = writeln!(report, "\n--- log tail ---");
        match current_log_file().map(std::fs::read_to_string) {
            Some(Ok(content)) => {
                let lines: Vec<&str> = content.lines().collect();
                let start = lines.len().saturating_sub(MAX_LOG_TAIL_LINES);
                for line in &lines[start..] {
                    let _ = writeln!(report, "{line}");
                }
            }
            Some(Err(err)) => {
                let _ = writeln!(report, "log_read_error: {err}");
            }
            None => {
                let _ = writeln!(report, "(no log file)");
            }
        }
        report
    }

    fn write_report(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.report_dir)?;
        std::fs::write(self.report_path(), self.generate())
    }
}

impl BugReporter for FileBugReporter {
    fn dump_bug_report_to_file(&self) {
        let outcome = self.write_report();
        let mut last_error = self
            .last_dump_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match outcome {
            Ok(()) => {
                info!("event=bug_report_dump module=bug_report status=ok");
                *last_error = None;
            }
            Err(err) => {
                warn!("event=bug_report_dump module=bug_report status=error error={err}");
                *last_error = Some(err.to_string());
            }
        }
    }

    /// Fails while the most recent dump failed, so a stale or partial file
    /// is never handed out as a fresh report.
    fn bug_report(&self) -> std::io::Result<String> {
        if let Some(err) = self.last_dump_error() {
            return Err(std::io::Error::other(format!(
                "last bug report dump failed: {err}"
            )));
        }
        std::fs::read_to_string(self.report_path())
    }
}
