//! Habit and entry domain model.
//!
//! # Responsibility
//! - Define the habit record shown on the list screen.
//! - Hold the computed, date-ordered entries of one habit.
//!
//! # Invariants
//! - `EntryList` keeps at most one value per calendar day.
//! - Numerical values are stored in milli-units (`1.5 km` is `1500`).

use crate::model::timestamp::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Stable identifier of a habit.
pub type HabitId = Uuid;

/// One recorded value of a habit on one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub timestamp: Timestamp,
    pub value: i32,
}

impl Entry {
    /// No value recorded for the day.
    pub const UNKNOWN: i32 = -1;
    /// Explicitly not done.
    pub const NO: i32 = 0;
    /// Implied by the habit frequency.
    pub const YES_AUTO: i32 = 1;
    /// Checked by the user.
    pub const YES_MANUAL: i32 = 2;
    /// Skipped without breaking the streak.
    pub const SKIP: i32 = 3;

    pub fn new(timestamp: Timestamp, value: i32) -> Self {
        Self { timestamp, value }
    }

    pub fn is_unknown(&self) -> bool {
        self.value == Self::UNKNOWN
    }
}

/// Date-ordered mapping from day to recorded value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryList {
    values: BTreeMap<Timestamp, i32>,
}

impl EntryList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the entry for `timestamp`, or an `Entry::UNKNOWN` entry when
    /// nothing is recorded for that day.
    pub fn get(&self, timestamp: Timestamp) -> Entry {
        let value = self
            .values
            .get(&timestamp)
            .copied()
            .unwrap_or(Entry::UNKNOWN);
        Entry::new(timestamp, value)
    }

    pub fn contains(&self, timestamp: Timestamp) -> bool {
        self.values.contains_key(&timestamp)
    }

    /// Records `value` for the day and returns the previous value.
    pub fn record(&mut self, timestamp: Timestamp, value: i32) -> Option<i32> {
        self.values.insert(timestamp, value)
    }

    /// Removes the day and returns the removed value.
    pub fn clear(&mut self, timestamp: Timestamp) -> Option<i32> {
        self.values.remove(&timestamp)
    }

    /// Iterates entries from the oldest day to the newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = Entry> + '_ {
        self.values
            .iter()
            .map(|(timestamp, value)| Entry::new(*timestamp, *value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<Entry> for EntryList {
    fn from_iter<T: IntoIterator<Item = Entry>>(iter: T) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|entry| (entry.timestamp, entry.value))
                .collect(),
        }
    }
}

/// Habit record as seen by the list screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Habit {
    pub id: HabitId,
    pub name: String,
    /// Display unit of numerical habits; empty for yes/no habits.
    pub unit: String,
    pub is_numerical: bool,
    /// Zero-based slot on the list screen.
    pub position: u32,
    pub entries: EntryList,
}

impl Habit {
    /// Creates a yes/no habit with a generated stable ID.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), name)
    }

    /// Creates a numerical habit measured in `unit`.
    pub fn numerical(name: impl Into<String>, unit: impl Into<String>) -> Self {
        let mut habit = Self::new(name);
        habit.unit = unit.into();
        habit.is_numerical = true;
        habit
    }

    /// Creates a habit with a caller-provided ID, used when loading from storage.
    pub fn with_id(id: HabitId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            unit: String::new(),
            is_numerical: false,
            position: 0,
            entries: EntryList::new(),
        }
    }

    pub fn computed_entries(&self) -> &EntryList {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::{Entry, EntryList, Habit};
    use crate::model::timestamp::Timestamp;

    #[test]
    fn missing_day_reads_as_unknown() {
        let entries = EntryList::new();
        let day = Timestamp::from_unix_millis(0);
        let entry = entries.get(day);
        assert!(entry.is_unknown());
        assert_eq!(entry.timestamp, day);
        assert!(!entries.contains(day));
    }

    #[test]
    fn record_replaces_and_reports_previous_value() {
        let mut entries = EntryList::new();
        let day = Timestamp::from_unix_millis(0);
        assert_eq!(entries.record(day, Entry::YES_MANUAL), None);
        assert_eq!(entries.record(day, Entry::SKIP), Some(Entry::YES_MANUAL));
        assert_eq!(entries.get(day).value, Entry::SKIP);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries.clear(day), Some(Entry::SKIP));
        assert!(entries.is_empty());
    }

    #[test]
    fn iterates_in_date_order() {
        let day = Timestamp::from_unix_millis(0);
        let entries: EntryList = [
            Entry::new(day.plus_days(2), 3),
            Entry::new(day, 1),
            Entry::new(day.plus_days(1), 2),
        ]
        .into_iter()
        .collect();
        let values: Vec<i32> = entries.iter().map(|entry| entry.value).collect();
        assert_eq!(values, vec![1, 2, 3]);
        assert_eq!(entries.iter().next_back().map(|e| e.value), Some(3));
    }

    #[test]
    fn numerical_constructor_sets_unit() {
        let habit = Habit::numerical("Run", "km");
        assert!(habit.is_numerical);
        assert_eq!(habit.unit, "km");
        assert!(habit.computed_entries().is_empty());
        assert_ne!(habit.id, Habit::new("Run").id);
    }
}
