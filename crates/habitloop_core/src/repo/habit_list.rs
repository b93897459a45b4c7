//! Habit collection contract and in-memory implementation.
//!
//! # Responsibility
//! - Define the collection operations the list screen depends on.
//! - Provide a process-local store for tests and ephemeral sessions.
//!
//! # Invariants
//! - `habits()` returns habits ordered by `position`, positions `0..n`.
//! - `reorder(from, to)` moves `from` into the slot of `to` and shifts the rest.
//! - Entry mutations report the previous value so commands can be undone.

use crate::db::DbError;
use crate::model::habit::{Habit, HabitId};
use crate::model::timestamp::Timestamp;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Mutex, MutexGuard, PoisonError};

pub type StoreResult<T> = Result<T, StoreError>;

/// Habit store error for persistence and lookup failures.
#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    HabitNotFound(HabitId),
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::HabitNotFound(id) => write!(f, "habit not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted habit data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::HabitNotFound(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Collection of habits shown on the list screen.
///
/// Implementations must be safe to call from task-runner threads.
pub trait HabitList: Send + Sync {
    /// Snapshot of all habits in list order.
    fn habits(&self) -> StoreResult<Vec<Habit>>;
    fn get_by_id(&self, id: HabitId) -> StoreResult<Option<Habit>>;
    /// Appends a habit at the end of the list.
    fn add(&self, habit: &Habit) -> StoreResult<()>;
    fn reorder(&self, from: HabitId, to: HabitId) -> StoreResult<()>;
    /// Restores list invariants: contiguous positions, no orphan entries.
    fn repair(&self) -> StoreResult<()>;
    /// Records a value for one day and returns the value it replaced.
    fn record_entry(
        &self,
        habit: HabitId,
        timestamp: Timestamp,
        value: i32,
    ) -> StoreResult<Option<i32>>;
    /// Removes the value for one day and returns it.
    fn clear_entry(&self, habit: HabitId, timestamp: Timestamp) -> StoreResult<Option<i32>>;

    fn len(&self) -> StoreResult<usize> {
        Ok(self.habits()?.len())
    }

    fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }
}

/// Computes the list order after moving `from` into the slot of `to`.
pub(crate) fn reordered_ids(
    mut ids: Vec<HabitId>,
    from: HabitId,
    to: HabitId,
) -> StoreResult<Vec<HabitId>> {
    let from_index = ids
        .iter()
        .position(|id| *id == from)
        .ok_or(StoreError::HabitNotFound(from))?;
    let to_index = ids
        .iter()
        .position(|id| *id == to)
        .ok_or(StoreError::HabitNotFound(to))?;

    let moved = ids.remove(from_index);
    ids.insert(to_index, moved);
    Ok(ids)
}

/// Process-local habit list.
#[derive(Debug, Default)]
pub struct MemoryHabitList {
    habits: Mutex<Vec<Habit>>,
}

impl MemoryHabitList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a list from habits, keeping their given order.
    pub fn with_habits(habits: impl IntoIterator<Item = Habit>) -> Self {
        let list = Self::new();
        {
            let mut guard = list.lock();
            guard.extend(habits);
            renumber(&mut guard);
        }
        list
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Habit>> {
        self.habits.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_habit<T>(&self, id: HabitId, f: impl FnOnce(&mut Habit) -> T) -> StoreResult<T> {
        let mut guard = self.lock();
        let habit = guard
            .iter_mut()
            .find(|habit| habit.id == id)
            .ok_or(StoreError::HabitNotFound(id))?;
        Ok(f(habit))
    }
}

fn renumber(habits: &mut [Habit]) {
    for (index, habit) in habits.iter_mut().enumerate() {
        habit.position = index as u32;
    }
}

impl HabitList for MemoryHabitList {
    fn habits(&self) -> StoreResult<Vec<Habit>> {
        Ok(self.lock().clone())
    }

    fn get_by_id(&self, id: HabitId) -> StoreResult<Option<Habit>> {
        Ok(self.lock().iter().find(|habit| habit.id == id).cloned())
    }

    fn add(&self, habit: &Habit) -> StoreResult<()> {
        let mut guard = self.lock();
        let mut habit = habit.clone();
        habit.position = guard.len() as u32;
        guard.push(habit);
        Ok(())
    }

    fn reorder(&self, from: HabitId, to: HabitId) -> StoreResult<()> {
        let mut guard = self.lock();
        let order = reordered_ids(guard.iter().map(|habit| habit.id).collect(), from, to)?;
        guard.sort_by_key(|habit| order.iter().position(|id| *id == habit.id));
        renumber(&mut guard);
        Ok(())
    }

    fn repair(&self) -> StoreResult<()> {
        let mut guard = self.lock();
        guard.sort_by_key(|habit| habit.position);
        renumber(&mut guard);
        Ok(())
    }

    fn record_entry(
        &self,
        habit: HabitId,
        timestamp: Timestamp,
        value: i32,
    ) -> StoreResult<Option<i32>> {
        self.with_habit(habit, |habit| habit.entries.record(timestamp, value))
    }

    fn clear_entry(&self, habit: HabitId, timestamp: Timestamp) -> StoreResult<Option<i32>> {
        self.with_habit(habit, |habit| habit.entries.clear(timestamp))
    }
}
