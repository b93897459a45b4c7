use habitloop_core::db::{open_db, open_db_in_memory, SharedConnection};
use habitloop_core::{
    Command, CommandRunner, Entry, Habit, HabitList, HistoryCommandRunner, SqliteHabitList,
    StoreError, Timestamp,
};
use std::sync::Arc;
use uuid::Uuid;

fn store() -> (SharedConnection, SqliteHabitList) {
    let conn = SharedConnection::new(open_db_in_memory().unwrap());
    (conn.clone(), SqliteHabitList::new(conn))
}

fn names(list: &SqliteHabitList) -> Vec<String> {
    list.habits()
        .unwrap()
        .into_iter()
        .map(|habit| habit.name)
        .collect()
}

#[test]
fn add_appends_in_list_order_with_entries() {
    let (_, list) = store();
    let day = Timestamp::from_unix_millis(0);

    let mut run = Habit::numerical("Run", "km");
    run.entries.record(day, 5_000);
    list.add(&Habit::new("Read")).unwrap();
    list.add(&run).unwrap();

    let habits = list.habits().unwrap();
    assert_eq!(habits.len(), 2);
    assert_eq!(habits[0].name, "Read");
    assert_eq!(habits[1].position, 1);
    assert!(habits[1].is_numerical);
    assert_eq!(habits[1].unit, "km");
    assert_eq!(habits[1].computed_entries().get(day).value, 5_000);
    assert!(habits[0].computed_entries().is_empty());
}

#[test]
fn get_by_id_loads_entries_and_misses_cleanly() {
    let (_, list) = store();
    let habit = Habit::new("Read");
    list.add(&habit).unwrap();
    let day = Timestamp::today();
    list.record_entry(habit.id, day, Entry::YES_MANUAL).unwrap();

    let loaded = list.get_by_id(habit.id).unwrap().unwrap();
    assert_eq!(loaded.entries.get(day).value, Entry::YES_MANUAL);
    assert!(list.get_by_id(Uuid::new_v4()).unwrap().is_none());
}

#[test]
fn record_and_clear_report_previous_values() {
    let (_, list) = store();
    let habit = Habit::new("Read");
    list.add(&habit).unwrap();
    let day = Timestamp::today();

    assert_eq!(list.record_entry(habit.id, day, 2).unwrap(), None);
    assert_eq!(list.record_entry(habit.id, day, 3).unwrap(), Some(2));
    assert_eq!(list.clear_entry(habit.id, day).unwrap(), Some(3));
    assert_eq!(list.clear_entry(habit.id, day).unwrap(), None);
}

#[test]
fn entry_mutation_requires_existing_habit() {
    let (_, list) = store();
    let missing = Uuid::new_v4();
    let err = list
        .record_entry(missing, Timestamp::today(), 2)
        .unwrap_err();
    assert!(matches!(err, StoreError::HabitNotFound(id) if id == missing));
}

#[test]
fn reorder_moves_habit_into_target_slot() {
    let (_, list) = store();
    for name in ["Read", "Run", "Sleep", "Write"] {
        list.add(&Habit::new(name)).unwrap();
    }
    let habits = list.habits().unwrap();

    list.reorder(habits[0].id, habits[2].id).unwrap();
    assert_eq!(names(&list), vec!["Run", "Sleep", "Read", "Write"]);

    list.reorder(habits[3].id, habits[1].id).unwrap();
    assert_eq!(names(&list), vec!["Write", "Run", "Sleep", "Read"]);

    let positions: Vec<u32> = list.habits().unwrap().iter().map(|h| h.position).collect();
    assert_eq!(positions, vec![0, 1, 2, 3]);
}

#[test]
fn reorder_with_unknown_habit_changes_nothing() {
    let (_, list) = store();
    list.add(&Habit::new("Read")).unwrap();
    list.add(&Habit::new("Run")).unwrap();
    let first = list.habits().unwrap()[0].id;

    let err = list.reorder(Uuid::new_v4(), first).unwrap_err();
    assert!(matches!(err, StoreError::HabitNotFound(_)));
    assert_eq!(names(&list), vec!["Read", "Run"]);
}

#[test]
fn repair_renumbers_positions_and_drops_orphans() {
    let (conn, list) = store();
    list.add(&Habit::new("Read")).unwrap();
    list.add(&Habit::new("Run")).unwrap();
    {
        let guard = conn.lock();
        guard
            .execute_batch(
                "UPDATE habits SET position = position * 10 + 5;
                 PRAGMA foreign_keys = OFF;
                 INSERT INTO repetitions (habit_uuid, timestamp, value) VALUES ('ghost', 0, 2);
                 PRAGMA foreign_keys = ON;",
            )
            .unwrap();
    }

    list.repair().unwrap();

    let positions: Vec<u32> = list.habits().unwrap().iter().map(|h| h.position).collect();
    assert_eq!(positions, vec![0, 1]);
    assert_eq!(names(&list), vec!["Read", "Run"]);
    let orphans: i64 = conn
        .lock()
        .query_row(
            "SELECT COUNT(*) FROM repetitions WHERE habit_uuid = 'ghost';",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(orphans, 0);
}

#[test]
fn commands_persist_and_undo_through_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("habits.db");
    let list = Arc::new(SqliteHabitList::new(SharedConnection::new(
        open_db(&path).unwrap(),
    )));
    let habit = Habit::new("Read");
    list.add(&habit).unwrap();
    let day = Timestamp::today();

    let runner = HistoryCommandRunner::new(list.clone());
    runner.run(Command::create_repetition(habit.id, day, Entry::YES_MANUAL));
    runner.run(Command::create_repetition(habit.id, day, Entry::SKIP));
    assert!(runner.undo().unwrap());

    let reopened = SqliteHabitList::new(SharedConnection::new(open_db(&path).unwrap()));
    let loaded = reopened.get_by_id(habit.id).unwrap().unwrap();
    assert_eq!(loaded.entries.get(day).value, Entry::YES_MANUAL);
}

const EARLY_ID: &str = "bbbbbbbb-0000-4000-8000-000000000001";
const LATE_ID: &str = "aaaaaaaa-0000-4000-8000-000000000002";

fn insert_raw_habit(
    conn: &SharedConnection,
    uuid: &str,
    name: &str,
    position: i64,
    created_at: i64,
) {
    conn.lock()
        .execute(
            "INSERT INTO habits (uuid, name, position, created_at) VALUES (?1, ?2, ?3, ?4);",
            rusqlite::params![uuid, name, position, created_at],
        )
        .unwrap();
}

#[test]
fn position_ties_list_in_insertion_order_everywhere() {
    let (conn, list) = store();
    insert_raw_habit(&conn, EARLY_ID, "Early", 0, 1_000);
    insert_raw_habit(&conn, LATE_ID, "Late", 0, 2_000);

    assert_eq!(names(&list), vec!["Early", "Late"]);

    list.repair().unwrap();
    assert_eq!(names(&list), vec!["Early", "Late"]);
    let positions: Vec<u32> = list.habits().unwrap().iter().map(|h| h.position).collect();
    assert_eq!(positions, vec![0, 1]);
}

#[test]
fn reorder_on_tied_positions_moves_the_listed_habit() {
    let (conn, list) = store();
    insert_raw_habit(&conn, EARLY_ID, "Early", 0, 1_000);
    insert_raw_habit(&conn, LATE_ID, "Late", 0, 2_000);
    let shown = list.habits().unwrap();

    list.reorder(shown[1].id, shown[0].id).unwrap();

    assert_eq!(names(&list), vec!["Late", "Early"]);
}

#[test]
fn out_of_range_positions_are_rejected_as_invalid_data() {
    for position in [-1_i64, i64::from(u32::MAX) + 1] {
        let (conn, list) = store();
        insert_raw_habit(&conn, EARLY_ID, "Broken", position, 1_000);

        match list.habits().unwrap_err() {
            StoreError::InvalidData(message) => {
                assert!(message.contains("out-of-range position"), "{message}");
                assert!(message.contains(&position.to_string()), "{message}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}

