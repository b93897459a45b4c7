//! Habit domain model.
//!
//! # Responsibility
//! - Define habits, their dated entries and the calendar-day timestamp.
//!
//! # Invariants
//! - Every habit is identified by a stable `HabitId`.
//! - Entries are keyed by calendar day, never by wall-clock instant.

pub mod habit;
pub mod timestamp;
