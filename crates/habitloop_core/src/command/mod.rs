//! Undoable domain commands.
//!
//! # Responsibility
//! - Describe habit mutations as values built by the coordinator.
//! - Apply them against a `HabitList` and keep undo/redo history.
//!
//! # Invariants
//! - The coordinator never mutates habits directly; it only hands commands
//!   to a `CommandRunner`.
//! - Only successfully executed commands enter the undo history.

use crate::model::habit::HabitId;
use crate::model::timestamp::Timestamp;
use crate::repo::habit_list::{HabitList, StoreResult};
use log::{debug, error};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Creates or overwrites the value of one habit on one day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRepetitionCommand {
    pub habit_id: HabitId,
    pub timestamp: Timestamp,
    pub value: i32,
    // Outer `None`: not executed yet. Inner `None`: the day had no value.
    previous: Option<Option<i32>>,
}

impl CreateRepetitionCommand {
    pub fn new(habit_id: HabitId, timestamp: Timestamp, value: i32) -> Self {
        Self {
            habit_id,
            timestamp,
            value,
            previous: None,
        }
    }

    fn execute(&mut self, habits: &dyn HabitList) -> StoreResult<()> {
        let previous = habits.record_entry(self.habit_id, self.timestamp, self.value)?;
        self.previous = Some(previous);
        Ok(())
    }

    fn undo(&mut self, habits: &dyn HabitList) -> StoreResult<()> {
        match self.previous.take() {
            Some(Some(value)) => {
                habits.record_entry(self.habit_id, self.timestamp, value)?;
            }
            Some(None) => {
                habits.clear_entry(self.habit_id, self.timestamp)?;
            }
            None => {}
        }
        Ok(())
    }
}

/// Atomic, undoable unit of domain mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    CreateRepetition(CreateRepetitionCommand),
}

impl Command {
    /// Shorthand for `Command::CreateRepetition`.
    pub fn create_repetition(habit_id: HabitId, timestamp: Timestamp, value: i32) -> Self {
        Self::CreateRepetition(CreateRepetitionCommand::new(habit_id, timestamp, value))
    }

    /// Stable name used in log events.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateRepetition(_) => "create_repetition",
        }
    }

    pub fn execute(&mut self, habits: &dyn HabitList) -> StoreResult<()> {
        match self {
            Self::CreateRepetition(command) => command.execute(habits),
        }
    }

    pub fn undo(&mut self, habits: &dyn HabitList) -> StoreResult<()> {
        match self {
            Self::CreateRepetition(command) => command.undo(habits),
        }
    }
}

/// Executor that applies commands built by the coordinator.
pub trait CommandRunner: Send + Sync {
    fn run(&self, command: Command);
}

#[derive(Debug, Default)]
struct CommandHistory {
    undo: Vec<Command>,
    redo: Vec<Command>,
}

/// Command runner with undo/redo stacks over one habit list.
pub struct HistoryCommandRunner {
    habits: Arc<dyn HabitList>,
    history: Mutex<CommandHistory>,
}

impl HistoryCommandRunner {
    pub fn new(habits: Arc<dyn HabitList>) -> Self {
        Self {
            habits,
            history: Mutex::new(CommandHistory::default()),
        }
    }

    /// Reverts the most recent command. Returns `false` when nothing to undo.
    pub fn undo(&self) -> StoreResult<bool> {
        let mut history = self.lock();
        let Some(mut command) = history.undo.pop() else {
            return Ok(false);
        };
        if let Err(err) = command.undo(self.habits.as_ref()) {
            history.undo.push(command);
            return Err(err);
        }
        debug!("event=command_undo module=command status=ok command={}", command.name());
        history.redo.push(command);
        Ok(true)
    }

    /// Re-applies the most recently undone command.
    pub fn redo(&self) -> StoreResult<bool> {
        let mut history = self.lock();
        let Some(mut command) = history.redo.pop() else {
            return Ok(false);
        };
        if let Err(err) = command.execute(self.habits.as_ref()) {
            history.redo.push(command);
            return Err(err);
        }
        debug!("event=command_redo module=command status=ok command={}", command.name());
        history.undo.push(command);
        Ok(true)
    }

    pub fn can_undo(&self) -> bool {
        !self.lock().undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.lock().redo.is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, CommandHistory> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CommandRunner for HistoryCommandRunner {
    fn run(&self, mut command: Command) {
        match command.execute(self.habits.as_ref()) {
            Ok(()) => {
                debug!("event=command_run module=command status=ok command={}", command.name());
                let mut history = self.lock();
                history.undo.push(command);
                history.redo.clear();
            }
            Err(err) => {
                error!(
                    "event=command_run module=command status=error command={} error={err}",
                    command.name()
                );
            }
        }
    }
}
