//! Core domain logic for HabitLoop.
//! This crate turns list-screen intents into commands, background tasks and
//! screen notifications.

pub mod bug_report;
pub mod command;
pub mod db;
pub mod export;
pub mod logging;
pub mod model;
pub mod preferences;
pub mod repo;
pub mod service;
pub mod task;
pub mod ui;

pub use bug_report::{BugReporter, FileBugReporter};
pub use command::{Command, CommandRunner, CreateRepetitionCommand, HistoryCommandRunner};
pub use export::{
    CsvHabitsExporter, DirFinder, ExportCsvTask, ExportError, FixedDirFinder, HabitsExporter,
};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::habit::{Entry, EntryList, Habit, HabitId};
pub use model::timestamp::Timestamp;
pub use preferences::{MemoryPreferences, Preferences, SqlitePreferences};
pub use repo::habit_list::{HabitList, MemoryHabitList, StoreError, StoreResult};
pub use repo::sqlite_habit_list::SqliteHabitList;
pub use service::habit_list_coordinator::{CoordinatorContext, HabitListCoordinator};
pub use task::{SingleThreadTaskRunner, Task, TaskRunner, ThreadTaskRunner};
pub use ui::message::Message;
pub use ui::screen::{ConfirmCallback, NumberPickerCallback, Screen};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_matches_manifest() {
        assert_eq!(core_version(), env!("CARGO_PKG_VERSION"));
        assert!(!core_version().is_empty());
    }
}
