//! Habit list use-case coordinator.
//!
//! # Responsibility
//! - Translate list-screen intents into commands, background tasks and
//!   screen notifications.
//! - Downgrade collaborator failures to `Message`s at this boundary.
//!
//! # Invariants
//! - Each intent issues at most one command.
//! - Export, reorder and repair return right after submitting a task; their
//!   notifications run from the task completion.
//! - The "repaired" notification is never shown before `repair()` returned.
//! - The sync key pair is only written after the user confirmed.

use crate::bug_report::BugReporter;
use crate::command::{Command, CommandRunner};
use crate::export::{DirFinder, ExportCsvTask, HabitsExporter};
use crate::model::habit::{Habit, HabitId};
use crate::model::timestamp::Timestamp;
use crate::preferences::Preferences;
use crate::repo::habit_list::{HabitList, StoreError};
use crate::task::{Task, TaskRunner};
use crate::ui::message::Message;
use crate::ui::screen::{NumberPickerCallback, Screen};
use log::{debug, error, info, warn};
use std::sync::Arc;

/// Numerical values are stored in thousandths of the display unit.
const VALUE_SCALE: f64 = 1000.0;

/// Hint number recorded on first run ("no habit" hint).
const NO_HABIT_HINT: i32 = -1;

/// Collaborators injected into [`HabitListCoordinator`].
#[derive(Clone)]
pub struct CoordinatorContext {
    pub habits: Arc<dyn HabitList>,
    pub dir_finder: Arc<dyn DirFinder>,
    pub task_runner: Arc<dyn TaskRunner>,
    pub screen: Arc<dyn Screen>,
    pub command_runner: Arc<dyn CommandRunner>,
    pub prefs: Arc<dyn Preferences>,
    pub bug_reporter: Arc<dyn BugReporter>,
    pub exporter: Arc<dyn HabitsExporter>,
}

/// Entry point for habit list UI events.
pub struct HabitListCoordinator {
    ctx: CoordinatorContext,
}

impl HabitListCoordinator {
    pub fn new(ctx: CoordinatorContext) -> Self {
        Self { ctx }
    }

    /// Opens the detail screen of `habit`.
    pub fn on_click_habit(&self, habit: &Habit) {
        debug!("event=habit_click module=coordinator status=ok");
        self.ctx.screen.show_habit_screen(habit);
    }

    /// Opens a number picker for the value recorded on `timestamp`.
    ///
    /// The picker shows the stored value in display units; a confirmed
    /// value is rounded to the nearest milli-unit and recorded.
    pub fn on_edit(&self, habit: &Habit, timestamp: Timestamp) {
        let old_value = habit.computed_entries().get(timestamp).value;
        let callback = EditValueCallback {
            command_runner: Arc::clone(&self.ctx.command_runner),
            habit_id: habit.id,
            timestamp,
        };
        self.ctx.screen.show_number_picker(
            f64::from(old_value) / VALUE_SCALE,
            &habit.unit,
            Box::new(callback),
        );
    }

    /// Records `value` for `timestamp` exactly as given.
    pub fn on_toggle(&self, habit: &Habit, timestamp: Timestamp, value: i32) {
        self.ctx
            .command_runner
            .run(Command::create_repetition(habit.id, timestamp, value));
    }

    /// Exports every habit in the background and offers the produced file.
    pub fn on_export_csv(&self) {
        let habits = match self.ctx.habits.habits() {
            Ok(habits) => habits,
            Err(err) => {
                error!("event=habit_export module=coordinator status=error stage=snapshot error={err}");
                self.ctx.screen.show_message(Message::CouldNotExport);
                return;
            }
        };
        let output_dir = self.ctx.dir_finder.csv_output_dir();
        info!(
            "event=habit_export module=coordinator status=start habit_count={}",
            habits.len()
        );

        let screen = Arc::clone(&self.ctx.screen);
        self.ctx.task_runner.execute(Box::new(ExportCsvTask::new(
            Arc::clone(&self.ctx.exporter),
            habits,
            output_dir,
            Box::new(move |filename| match filename {
                Some(filename) => screen.show_send_file_screen(&filename),
                None => screen.show_message(Message::CouldNotExport),
            }),
        )));
    }

    /// Marks first run as done and shows the introduction.
    pub fn on_first_run(&self) {
        info!("event=first_run module=coordinator status=ok");
        self.ctx.prefs.set_first_run(false);
        self.ctx
            .prefs
            .update_last_hint(NO_HABIT_HINT, Timestamp::today());
        self.ctx.screen.show_intro_screen();
    }

    /// Moves `from` into the list slot of `to` in the background.
    pub fn on_reorder_habit(&self, from: &Habit, to: &Habit) {
        self.ctx.task_runner.execute(Box::new(ReorderHabitsTask {
            habits: Arc::clone(&self.ctx.habits),
            from: from.id,
            to: to.id,
        }));
    }

    /// Repairs the habit store in the background, then reports the outcome.
    pub fn on_repair_db(&self) {
        info!("event=habit_store_repair module=coordinator status=start");
        self.ctx.task_runner.execute(Box::new(RepairHabitsTask {
            habits: Arc::clone(&self.ctx.habits),
            screen: Arc::clone(&self.ctx.screen),
            outcome: None,
        }));
    }

    /// Generates a bug report and offers it to the developer.
    pub fn on_send_bug_report(&self) {
        self.ctx.bug_reporter.dump_bug_report_to_file();

        match self.ctx.bug_reporter.bug_report() {
            Ok(log) => self
                .ctx
                .screen
                .show_send_bug_report_to_developer_screen(&log),
            Err(err) => {
                error!("event=bug_report module=coordinator status=error error={err}");
                self.ctx
                    .screen
                    .show_message(Message::CouldNotGenerateBugReport);
            }
        }
    }

    /// Counts the launch and runs the first-run sequence when due.
    pub fn on_startup(&self) {
        self.ctx.prefs.increment_launch_count();
        debug!(
            "event=startup module=coordinator status=ok launch_count={}",
            self.ctx.prefs.launch_count()
        );
        if self.ctx.prefs.is_first_run() {
            self.on_first_run();
        }
    }

    /// Offers a sync key pair received from outside the app.
    ///
    /// An already active key is reported and ignored; a new key is only
    /// installed once the user confirms.
    pub fn on_sync_key_offer(&self, sync_key: &str, encryption_key: &str) {
        if self.ctx.prefs.sync_key() == sync_key {
            info!("event=sync_key_offer module=coordinator status=ok outcome=already_installed");
            self.ctx
                .screen
                .show_message(Message::SyncKeyAlreadyInstalled);
            return;
        }

        let prefs = Arc::clone(&self.ctx.prefs);
        let screen = Arc::clone(&self.ctx.screen);
        let sync_key = sync_key.to_string();
        let encryption_key = encryption_key.to_string();
        self.ctx
            .screen
            .show_confirm_install_sync_key(Box::new(move || {
                prefs.enable_sync(&sync_key, &encryption_key);
                info!("event=sync_key_offer module=coordinator status=ok outcome=installed");
                screen.show_message(Message::SyncEnabled);
            }));
    }
}

struct EditValueCallback {
    command_runner: Arc<dyn CommandRunner>,
    habit_id: HabitId,
    timestamp: Timestamp,
}

impl NumberPickerCallback for EditValueCallback {
    fn on_number_picked(self: Box<Self>, new_value: f64) {
        let value = (new_value * VALUE_SCALE).round() as i32;
        self.command_runner.run(Command::create_repetition(
            self.habit_id,
            self.timestamp,
            value,
        ));
    }
}

struct ReorderHabitsTask {
    habits: Arc<dyn HabitList>,
    from: HabitId,
    to: HabitId,
}

impl Task for ReorderHabitsTask {
    fn name(&self) -> &'static str {
        "reorder_habits"
    }

    fn do_in_background(&mut self) {
        if let Err(err) = self.habits.reorder(self.from, self.to) {
            warn!("event=habit_reorder module=coordinator status=error error={err}");
        }
    }
}

struct RepairHabitsTask {
    habits: Arc<dyn HabitList>,
    screen: Arc<dyn Screen>,
    outcome: Option<Result<(), StoreError>>,
}

impl Task for RepairHabitsTask {
    fn name(&self) -> &'static str {
        "repair_habits"
    }

    fn do_in_background(&mut self) {
        self.outcome = Some(self.habits.repair());
    }

    fn on_post_execute(self: Box<Self>) {
        let task = *self;
        match task.outcome {
            Some(Ok(())) => task.screen.show_message(Message::DatabaseRepaired),
            Some(Err(err)) => {
                error!("event=habit_store_repair module=coordinator status=error error={err}");
                task.screen.show_message(Message::CouldNotRepairDatabase);
            }
            None => {
                error!("event=habit_store_repair module=coordinator status=error error=interrupted");
                task.screen.show_message(Message::CouldNotRepairDatabase);
            }
        }
    }
}
