//! SQLite-backed preferences.
//!
//! # Invariants
//! - All values are loaded once at construction and cached in memory.
//! - Every setter writes only the keys whose value changed.

use super::{MemoryPreferences, PreferenceValues, Preferences};
use crate::db::SharedConnection;
use crate::model::timestamp::Timestamp;
use crate::repo::habit_list::{StoreError, StoreResult};
use log::error;
use rusqlite::params;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

const KEY_FIRST_RUN: &str = "first_run";
const KEY_LAST_HINT_NUMBER: &str = "last_hint_number";
const KEY_LAST_HINT_TIMESTAMP: &str = "last_hint_timestamp";
const KEY_LAUNCH_COUNT: &str = "launch_count";
const KEY_SYNC_KEY: &str = "sync_key";
const KEY_ENCRYPTION_KEY: &str = "encryption_key";
const KEY_SYNC_ENABLED: &str = "sync_enabled";

/// Preferences persisted in the `preferences` key/value table.
pub struct SqlitePreferences {
    conn: SharedConnection,
    cache: MemoryPreferences,
    last_write_error: Mutex<Option<String>>,
}

impl SqlitePreferences {
    /// Loads persisted values; missing keys fall back to defaults.
    pub fn load(conn: SharedConnection) -> StoreResult<Self> {
        let stored = {
            let guard = conn.lock();
            let mut stmt = guard.prepare("SELECT key, value FROM preferences;")?;
            let rows = stmt
                .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
                .collect::<Result<HashMap<_, _>, _>>()?;
            rows
        };
        let values = values_from_rows(&stored)?;
        Ok(Self {
            conn,
            cache: MemoryPreferences::with_values(values),
            last_write_error: Mutex::new(None),
        })
    }

    /// Failure of the most recent write, if it failed.
    pub fn last_write_error(&self) -> Option<String> {
        self.last_write_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn write(&self, update: impl FnOnce(&MemoryPreferences)) {
        let before = self.cache.snapshot();
        update(&self.cache);
        let after = self.cache.snapshot();

        let changed: Vec<(&str, String)> = value_rows(&after)
            .into_iter()
            .zip(value_rows(&before))
            .filter(|(new, old)| new.1 != old.1)
            .map(|(new, _)| new)
            .collect();
        if changed.is_empty() {
            return;
        }

        let outcome = self.persist(&changed);
        let mut last_error = self
            .last_write_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match outcome {
            Ok(()) => *last_error = None,
            Err(err) => {
                error!(
                    "event=preferences_write module=preferences status=error keys={} error={err}",
                    changed.iter().map(|(key, _)| *key).collect::<Vec<_>>().join(",")
                );
                *last_error = Some(err.to_string());
            }
        }
    }

    fn persist(&self, rows: &[(&str, String)]) -> StoreResult<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        for (key, value) in rows {
            tx.execute(
                "INSERT INTO preferences (key, value) VALUES (?1, ?2)
                 ON CONFLICT (key) DO UPDATE SET
                    value = excluded.value,
                    updated_at = (strftime('%s', 'now') * 1000);",
                params![key, value],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}

fn value_rows(values: &PreferenceValues) -> Vec<(&'static str, String)> {
    vec![
        (KEY_FIRST_RUN, values.first_run.to_string()),
        (KEY_LAST_HINT_NUMBER, values.last_hint_number.to_string()),
        (
            KEY_LAST_HINT_TIMESTAMP,
            values
                .last_hint_timestamp
                .map(|ts| ts.unix_millis().to_string())
                .unwrap_or_default(),
        ),
        (KEY_LAUNCH_COUNT, values.launch_count.to_string()),
        (KEY_SYNC_KEY, values.sync_key.clone()),
        (KEY_ENCRYPTION_KEY, values.encryption_key.clone()),
        (KEY_SYNC_ENABLED, values.sync_enabled.to_string()),
    ]
}

fn values_from_rows(rows: &HashMap<String, String>) -> StoreResult<PreferenceValues> {
    let mut values = PreferenceValues::default();
    if let Some(raw) = rows.get(KEY_FIRST_RUN) {
        values.first_run = parse(KEY_FIRST_RUN, raw)?;
    }
    if let Some(raw) = rows.get(KEY_LAST_HINT_NUMBER) {
        values.last_hint_number = parse(KEY_LAST_HINT_NUMBER, raw)?;
    }
    if let Some(raw) = rows.get(KEY_LAST_HINT_TIMESTAMP).filter(|raw| !raw.is_empty()) {
        values.last_hint_timestamp = Some(Timestamp::from_unix_millis(parse(
            KEY_LAST_HINT_TIMESTAMP,
            raw,
        )?));
    }
    if let Some(raw) = rows.get(KEY_LAUNCH_COUNT) {
        values.launch_count = parse(KEY_LAUNCH_COUNT, raw)?;
    }
    if let Some(raw) = rows.get(KEY_SYNC_KEY) {
        values.sync_key = raw.clone();
    }
    if let Some(raw) = rows.get(KEY_ENCRYPTION_KEY) {
        values.encryption_key = raw.clone();
    }
    if let Some(raw) = rows.get(KEY_SYNC_ENABLED) {
        values.sync_enabled = parse(KEY_SYNC_ENABLED, raw)?;
    }
    Ok(values)
}

fn parse<T: std::str::FromStr>(key: &str, raw: &str) -> StoreResult<T> {
    raw.parse()
        .map_err(|_| StoreError::InvalidData(format!("preference `{key}` has invalid value")))
}

impl Preferences for SqlitePreferences {
    fn is_first_run(&self) -> bool {
        self.cache.is_first_run()
    }

    fn set_first_run(&self, first_run: bool) {
        self.write(|cache| cache.set_first_run(first_run));
    }

    fn update_last_hint(&self, number: i32, timestamp: Timestamp) {
        self.write(|cache| cache.update_last_hint(number, timestamp));
    }

    fn last_hint_number(&self) -> i32 {
        self.cache.last_hint_number()
    }

    fn last_hint_timestamp(&self) -> Option<Timestamp> {
        self.cache.last_hint_timestamp()
    }

    fn increment_launch_count(&self) {
        self.write(MemoryPreferences::increment_launch_count);
    }

    fn launch_count(&self) -> u32 {
        self.cache.launch_count()
    }

    fn sync_key(&self) -> String {
        self.cache.sync_key()
    }

    fn encryption_key(&self) -> String {
        self.cache.encryption_key()
    }

    fn is_sync_enabled(&self) -> bool {
        self.cache.is_sync_enabled()
    }

    fn enable_sync(&self, sync_key: &str, encryption_key: &str) {
        self.write(|cache| cache.enable_sync(sync_key, encryption_key));
    }

    fn disable_sync(&self) {
        self.write(MemoryPreferences::disable_sync);
    }
}
