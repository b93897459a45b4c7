//! SQLite-backed habit list.
//!
//! # Responsibility
//! - Persist habits and their per-day values in `habits`/`repetitions`.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Multi-row writes (reorder, repair) run in one transaction.
//! - Read paths reject malformed persisted rows instead of masking them.

use crate::db::SharedConnection;
use crate::model::habit::{Entry, EntryList, Habit, HabitId};
use crate::model::timestamp::Timestamp;
use crate::repo::habit_list::{reordered_ids, HabitList, StoreError, StoreResult};
use log::info;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use uuid::Uuid;

const HABIT_SELECT_SQL: &str = "SELECT uuid, name, unit, is_numerical, position FROM habits";
/// List order shared by reads, reorder and repair; ties on `position` break
/// by insertion time, then id.
const HABIT_ORDER_SQL: &str = "ORDER BY position, created_at, uuid";

/// Habit list stored in the `habits` and `repetitions` tables.
#[derive(Clone)]
pub struct SqliteHabitList {
    conn: SharedConnection,
}

impl SqliteHabitList {
    /// Wraps a migrated connection (see `db::open_db`).
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }
}

impl HabitList for SqliteHabitList {
    fn habits(&self) -> StoreResult<Vec<Habit>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!("{HABIT_SELECT_SQL} {HABIT_ORDER_SQL};"))?;
        let mut rows = stmt.query([])?;
        let mut habits = Vec::new();
        while let Some(row) = rows.next()? {
            habits.push(parse_habit_row(row)?);
        }

        let mut entries = load_all_entries(&conn)?;
        for habit in &mut habits {
            if let Some(list) = entries.remove(&habit.id) {
                habit.entries = list;
            }
        }
        Ok(habits)
    }

    fn get_by_id(&self, id: HabitId) -> StoreResult<Option<Habit>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!("{HABIT_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query(params![id.to_string()])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };
        let mut habit = parse_habit_row(row)?;
        habit.entries = load_entries(&conn, id)?;
        Ok(Some(habit))
    }

    fn add(&self, habit: &Habit) -> StoreResult<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let position: u32 =
            tx.query_row("SELECT COUNT(*) FROM habits;", [], |row| row.get(0))?;
        tx.execute(
            "INSERT INTO habits (uuid, name, unit, is_numerical, position)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                habit.id.to_string(),
                habit.name.as_str(),
                habit.unit.as_str(),
                habit.is_numerical,
                position,
            ],
        )?;
        for entry in habit.entries.iter() {
            upsert_entry(&tx, habit.id, entry.timestamp, entry.value)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn reorder(&self, from: HabitId, to: HabitId) -> StoreResult<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let order = reordered_ids(ordered_ids(&tx)?, from, to)?;
        write_positions(&tx, &order)?;
        tx.commit()?;
        Ok(())
    }

    fn repair(&self) -> StoreResult<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let orphans = tx.execute(
            "DELETE FROM repetitions
             WHERE habit_uuid NOT IN (SELECT uuid FROM habits);",
            [],
        )?;
        let order = ordered_ids(&tx)?;
        write_positions(&tx, &order)?;
        tx.commit()?;
        info!(
            "event=habit_store_repair module=repo status=ok habit_count={} orphan_entries={orphans}",
            order.len()
        );
        Ok(())
    }

    fn record_entry(
        &self,
        habit: HabitId,
        timestamp: Timestamp,
        value: i32,
    ) -> StoreResult<Option<i32>> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        ensure_habit_exists(&tx, habit)?;
        let previous = read_entry(&tx, habit, timestamp)?;
        upsert_entry(&tx, habit, timestamp, value)?;
        tx.commit()?;
        Ok(previous)
    }

    fn clear_entry(&self, habit: HabitId, timestamp: Timestamp) -> StoreResult<Option<i32>> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        ensure_habit_exists(&tx, habit)?;
        let previous = read_entry(&tx, habit, timestamp)?;
        tx.execute(
            "DELETE FROM repetitions WHERE habit_uuid = ?1 AND timestamp = ?2;",
            params![habit.to_string(), timestamp.unix_millis()],
        )?;
        tx.commit()?;
        Ok(previous)
    }
}

fn parse_habit_row(row: &Row<'_>) -> StoreResult<Habit> {
    let id = parse_uuid(&row.get::<_, String>(0)?)?;
    let position: i64 = row.get(4)?;
    let position = u32::try_from(position).map_err(|_| {
        StoreError::InvalidData(format!("out-of-range position {position} for {id}"))
    })?;

    let mut habit = Habit::with_id(id, row.get::<_, String>(1)?);
    habit.unit = row.get(2)?;
    habit.is_numerical = row.get(3)?;
    habit.position = position;
    Ok(habit)
}

fn parse_uuid(value: &str) -> StoreResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|err| StoreError::InvalidData(format!("invalid habit uuid `{value}`: {err}")))
}

fn load_entries(conn: &Connection, habit: HabitId) -> StoreResult<EntryList> {
    let mut stmt = conn.prepare(
        "SELECT timestamp, value FROM repetitions WHERE habit_uuid = ?1 ORDER BY timestamp;",
    )?;
    let entries = stmt
        .query_map(params![habit.to_string()], |row| {
            Ok(Entry::new(
                Timestamp::from_unix_millis(row.get(0)?),
                row.get(1)?,
            ))
        })?
        .collect::<Result<EntryList, _>>()?;
    Ok(entries)
}

fn load_all_entries(conn: &Connection) -> StoreResult<HashMap<HabitId, EntryList>> {
    let mut stmt = conn.prepare("SELECT habit_uuid, timestamp, value FROM repetitions;")?;
    let mut rows = stmt.query([])?;
    let mut entries: HashMap<HabitId, EntryList> = HashMap::new();
    while let Some(row) = rows.next()? {
        let habit = parse_uuid(&row.get::<_, String>(0)?)?;
        entries
            .entry(habit)
            .or_default()
            .record(Timestamp::from_unix_millis(row.get(1)?), row.get(2)?);
    }
    Ok(entries)
}

fn ordered_ids(conn: &Connection) -> StoreResult<Vec<HabitId>> {
    let mut stmt = conn.prepare(&format!("SELECT uuid FROM habits {HABIT_ORDER_SQL};"))?;
    let raw = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    raw.iter().map(|value| parse_uuid(value)).collect()
}

fn write_positions(conn: &Connection, order: &[HabitId]) -> StoreResult<()> {
    let mut stmt = conn.prepare("UPDATE habits SET position = ?1 WHERE uuid = ?2;")?;
    for (position, id) in order.iter().enumerate() {
        stmt.execute(params![position as i64, id.to_string()])?;
    }
    Ok(())
}

fn ensure_habit_exists(conn: &Connection, habit: HabitId) -> StoreResult<()> {
    let found = conn
        .query_row(
            "SELECT 1 FROM habits WHERE uuid = ?1;",
            params![habit.to_string()],
            |_| Ok(()),
        )
        .optional()?;
    found.ok_or(StoreError::HabitNotFound(habit))
}

fn read_entry(conn: &Connection, habit: HabitId, timestamp: Timestamp) -> StoreResult<Option<i32>> {
    let value = conn
        .query_row(
            "SELECT value FROM repetitions WHERE habit_uuid = ?1 AND timestamp = ?2;",
            params![habit.to_string(), timestamp.unix_millis()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value)
}

fn upsert_entry(
    conn: &Connection,
    habit: HabitId,
    timestamp: Timestamp,
    value: i32,
) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO repetitions (habit_uuid, timestamp, value) VALUES (?1, ?2, ?3)
         ON CONFLICT (habit_uuid, timestamp) DO UPDATE SET value = excluded.value;",
        params![habit.to_string(), timestamp.unix_millis(), value],
    )?;
    Ok(())
}
