use habitloop_core::db::migrations::{apply_migrations, latest_version};
use habitloop_core::db::{open_db, open_db_in_memory, DbError};
use rusqlite::Connection;

#[test]
fn in_memory_database_has_every_table() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    for table in ["habits", "repetitions", "preferences"] {
        assert!(table_exists(&conn, table), "table {table} does not exist");
    }
}

#[test]
fn reopening_a_file_database_keeps_its_data() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("habits.db");

    let first = open_db(&path).unwrap();
    first
        .execute(
            "INSERT INTO habits (uuid, name, position) VALUES ('h-1', 'Read', 0);",
            [],
        )
        .unwrap();
    drop(first);

    let second = open_db(&path).unwrap();
    let count: i64 = second
        .query_row("SELECT COUNT(*) FROM habits;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
    assert_eq!(schema_version(&second), latest_version());
}

#[test]
fn pending_migrations_apply_on_top_of_older_schema() {
    let mut conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(include_str!("../src/db/migrations/0001_habits.sql"))
        .unwrap();
    conn.execute_batch("PRAGMA user_version = 1;").unwrap();
    assert!(!table_exists(&conn, "preferences"));

    assert_eq!(apply_migrations(&mut conn).unwrap(), 1);
    assert_eq!(apply_migrations(&mut conn).unwrap(), 0);

    assert!(table_exists(&conn, "preferences"));
    assert_eq!(schema_version(&conn), latest_version());
}

#[test]
fn newer_schema_version_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    match open_db(&path).unwrap_err() {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn deleting_a_habit_cascades_to_its_entries() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "INSERT INTO habits (uuid, name, position) VALUES ('h-1', 'Read', 0);
         INSERT INTO repetitions (habit_uuid, timestamp, value) VALUES ('h-1', 0, 2);
         DELETE FROM habits WHERE uuid = 'h-1';",
    )
    .unwrap();
    let remaining: i64 = conn
        .query_row("SELECT COUNT(*) FROM repetitions;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(remaining, 0);
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn table_exists(conn: &Connection, table_name: &str) -> bool {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1);",
        [table_name],
        |row| row.get::<_, bool>(0),
    )
    .unwrap()
}
