//! Habit collection contracts and persistence implementations.
//!
//! # Responsibility
//! - Define the `HabitList` contract consumed by the list coordinator.
//! - Isolate SQLite query details from coordination logic.
//!
//! # Invariants
//! - Stores return semantic errors (`HabitNotFound`) in addition to DB
//!   transport errors.

pub mod habit_list;
pub mod sqlite_habit_list;
