//! User preferences consumed by the list coordinator.
//!
//! # Responsibility
//! - Track first-run state, hint history and launch count.
//! - Hold the active synchronization key pair.
//!
//! # Invariants
//! - A fresh store reports `is_first_run() == true` and an empty sync key.
//! - `enable_sync` replaces both keys together.

mod sqlite;

pub use sqlite::SqlitePreferences;

use crate::model::timestamp::Timestamp;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Preference store contract.
///
/// Setters are infallible from the caller's view; persistent
/// implementations log write failures and keep the in-process value.
/// A value whose write failed holds for the running process only and is
/// gone after the next load. This includes a key pair installed through
/// `enable_sync`, even though the caller already reported sync as enabled.
/// `SqlitePreferences::last_write_error` exposes the failure.
pub trait Preferences: Send + Sync {
    fn is_first_run(&self) -> bool;
    fn set_first_run(&self, first_run: bool);
    /// Records that hint `number` was shown on `timestamp`.
    fn update_last_hint(&self, number: i32, timestamp: Timestamp);
    fn last_hint_number(&self) -> i32;
    fn last_hint_timestamp(&self) -> Option<Timestamp>;
    fn increment_launch_count(&self);
    fn launch_count(&self) -> u32;
    fn sync_key(&self) -> String;
    fn encryption_key(&self) -> String;
    fn is_sync_enabled(&self) -> bool;
    fn enable_sync(&self, sync_key: &str, encryption_key: &str);
    fn disable_sync(&self);
}

/// Plain snapshot of every preference value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreferenceValues {
    pub first_run: bool,
    pub last_hint_number: i32,
    pub last_hint_timestamp: Option<Timestamp>,
    pub launch_count: u32,
    pub sync_key: String,
    pub encryption_key: String,
    pub sync_enabled: bool,
}

impl Default for PreferenceValues {
    fn default() -> Self {
        Self {
            first_run: true,
            last_hint_number: -1,
            last_hint_timestamp: None,
            launch_count: 0,
            sync_key: String::new(),
            encryption_key: String::new(),
            sync_enabled: false,
        }
    }
}

/// Process-local preferences.
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    values: Mutex<PreferenceValues>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values(values: PreferenceValues) -> Self {
        Self {
            values: Mutex::new(values),
        }
    }

    pub fn snapshot(&self) -> PreferenceValues {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, PreferenceValues> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Preferences for MemoryPreferences {
    fn is_first_run(&self) -> bool {
        self.lock().first_run
    }

    fn set_first_run(&self, first_run: bool) {
        self.lock().first_run = first_run;
    }

    fn update_last_hint(&self, number: i32, timestamp: Timestamp) {
        let mut values = self.lock();
        values.last_hint_number = number;
        values.last_hint_timestamp = Some(timestamp);
    }

    fn last_hint_number(&self) -> i32 {
        self.lock().last_hint_number
    }

    fn last_hint_timestamp(&self) -> Option<Timestamp> {
        self.lock().last_hint_timestamp
    }

    fn increment_launch_count(&self) {
        let mut values = self.lock();
        values.launch_count = values.launch_count.saturating_add(1);
    }

    fn launch_count(&self) -> u32 {
        self.lock().launch_count
    }

    fn sync_key(&self) -> String {
        self.lock().sync_key.clone()
    }

    fn encryption_key(&self) -> String {
        self.lock().encryption_key.clone()
    }

    fn is_sync_enabled(&self) -> bool {
        self.lock().sync_enabled
    }

    fn enable_sync(&self, sync_key: &str, encryption_key: &str) {
        let mut values = self.lock();
        values.sync_key = sync_key.to_string();
        values.encryption_key = encryption_key.to_string();
        values.sync_enabled = true;
    }

    fn disable_sync(&self) {
        let mut values = self.lock();
        values.sync_key.clear();
        values.encryption_key.clear();
        values.sync_enabled = false;
    }
}

#[cfg(test)]
mod tests {
    use super::{MemoryPreferences, Preferences};
    use crate::model::timestamp::Timestamp;

    #[test]
    fn fresh_store_is_first_run_without_sync() {
        let prefs = MemoryPreferences::new();
        assert!(prefs.is_first_run());
        assert_eq!(prefs.launch_count(), 0);
        assert_eq!(prefs.last_hint_number(), -1);
        assert!(prefs.last_hint_timestamp().is_none());
        assert!(prefs.sync_key().is_empty());
        assert!(!prefs.is_sync_enabled());
    }

    #[test]
    fn sync_keys_are_replaced_together() {
        let prefs = MemoryPreferences::new();
        prefs.enable_sync("key-a", "enc-a");
        prefs.enable_sync("key-b", "enc-b");
        assert_eq!(prefs.sync_key(), "key-b");
        assert_eq!(prefs.encryption_key(), "enc-b");
        assert!(prefs.is_sync_enabled());

        prefs.disable_sync();
        assert!(prefs.sync_key().is_empty());
        assert!(prefs.encryption_key().is_empty());
        assert!(!prefs.is_sync_enabled());
    }

    #[test]
    fn hint_and_launch_count_updates() {
        let prefs = MemoryPreferences::new();
        let day = Timestamp::from_unix_millis(0);
        prefs.update_last_hint(3, day);
        prefs.increment_launch_count();
        prefs.increment_launch_count();
        assert_eq!(prefs.last_hint_number(), 3);
        assert_eq!(prefs.last_hint_timestamp(), Some(day));
        assert_eq!(prefs.launch_count(), 2);
    }
}
