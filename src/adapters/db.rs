use rusqlite::{Connection, params};
use thiserror::Error;

use crate::domain::models::{NewSleepSession, SleepSession, TimestampMs};

pub const LATEST_SCHEMA_VERSION: u32 = 1;

const MIGRATIONS: &[(u32, &str)] = &[(
    1,
    r#"
CREATE TABLE IF NOT EXISTS sleep_sessions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at_ms INTEGER NOT NULL,
    ended_at_ms INTEGER NOT NULL,
    quality INTEGER NOT NULL DEFAULT -1
);

CREATE INDEX IF NOT EXISTS idx_sleep_sessions_id_desc
ON sleep_sessions (id DESC);
"#,
)];

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database operation failed: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("unsupported schema version {current}; latest supported is {latest}")]
    UnsupportedSchemaVersion { current: u32, latest: u32 },
}

pub fn open_connection(path: &str) -> Result<Connection, DbError> {
    Connection::open(path).map_err(DbError::from)
}

pub fn run_migrations(connection: &mut Connection) -> Result<(), DbError> {
    let current_version = schema_version(connection)?;

    if current_version > LATEST_SCHEMA_VERSION {
        return Err(DbError::UnsupportedSchemaVersion {
            current: current_version,
            latest: LATEST_SCHEMA_VERSION,
        });
    }

    let transaction = connection.transaction()?;

    for (version, sql) in MIGRATIONS {
        if *version > current_version {
            transaction.execute_batch(sql)?;
            transaction.pragma_update(None, "user_version", version)?;
        }
    }

    transaction.commit()?;

    Ok(())
}

pub fn schema_version(connection: &Connection) -> Result<u32, DbError> {
    let version = connection.pragma_query_value(None, "user_version", |row| row.get(0))?;
    Ok(version)
}

fn session_from_row(row: &rusqlite::Row<'_>) -> Result<SleepSession, rusqlite::Error> {
    Ok(SleepSession {
        id: row.get(0)?,
        started_at: TimestampMs(row.get(1)?),
        ended_at: TimestampMs(row.get(2)?),
        quality: row.get(3)?,
    })
}

pub fn insert_session(
    connection: &Connection,
    new_session: &NewSleepSession,
) -> Result<i64, DbError> {
    connection.execute(
        "INSERT INTO sleep_sessions (started_at_ms, ended_at_ms, quality) VALUES (?1, ?2, ?3)",
        params![
            new_session.started_at.0,
            new_session.ended_at.0,
            new_session.quality,
        ],
    )?;

    Ok(connection.last_insert_rowid())
}

pub fn update_session(connection: &Connection, session: &SleepSession) -> Result<(), DbError> {
    connection.execute(
        "UPDATE sleep_sessions SET started_at_ms = ?1, ended_at_ms = ?2, quality = ?3 WHERE id = ?4",
        params![
            session.started_at.0,
            session.ended_at.0,
            session.quality,
            session.id,
        ],
    )?;

    Ok(())
}

pub fn get_session(connection: &Connection, id: i64) -> Result<Option<SleepSession>, DbError> {
    let mut statement = connection.prepare(
        "SELECT id, started_at_ms, ended_at_ms, quality
         FROM sleep_sessions
         WHERE id = ?1",
    )?;

    let mut rows = statement.query(params![id])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(session_from_row(row)?));
    }

    Ok(None)
}

pub fn get_latest_session(connection: &Connection) -> Result<Option<SleepSession>, DbError> {
    let mut statement = connection.prepare(
        "SELECT id, started_at_ms, ended_at_ms, quality
         FROM sleep_sessions
         ORDER BY id DESC
         LIMIT 1",
    )?;

    let mut rows = statement.query([])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(session_from_row(row)?));
    }

    Ok(None)
}

pub fn list_all_sessions(connection: &Connection) -> Result<Vec<SleepSession>, DbError> {
    let mut statement = connection.prepare(
        "SELECT id, started_at_ms, ended_at_ms, quality
         FROM sleep_sessions
         ORDER BY id DESC",
    )?;

    let rows = statement.query_map([], session_from_row)?;

    let mut sessions = Vec::new();
    for row in rows {
        sessions.push(row?);
    }

    Ok(sessions)
}

pub fn list_sessions(
    connection: &Connection,
    limit: u32,
    offset: u32,
) -> Result<Vec<SleepSession>, DbError> {
    let mut statement = connection.prepare(
        "SELECT id, started_at_ms, ended_at_ms, quality
         FROM sleep_sessions
         ORDER BY id DESC
         LIMIT ?1 OFFSET ?2",
    )?;

    let rows = statement.query_map(params![i64::from(limit), i64::from(offset)], session_from_row)?;

    let mut sessions = Vec::new();
    for row in rows {
        sessions.push(row?);
    }

    Ok(sessions)
}

pub fn clear_sessions(connection: &Connection) -> Result<usize, DbError> {
    let removed = connection.execute("DELETE FROM sleep_sessions", [])?;
    Ok(removed)
}

pub fn count_sessions(connection: &Connection) -> Result<i64, DbError> {
    let count = connection.query_row("SELECT COUNT(*) FROM sleep_sessions", [], |row| row.get(0))?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use crate::domain::models::{NewSleepSession, TimestampMs, UNRATED_QUALITY};

    use super::{
        LATEST_SCHEMA_VERSION, clear_sessions, count_sessions, get_latest_session, get_session,
        insert_session, list_all_sessions, list_sessions, open_connection, run_migrations,
        schema_version, update_session,
    };

    fn temp_db_path(name: &str) -> PathBuf {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = dir.path().join(name);
        std::mem::forget(dir);
        path
    }

    fn new_session(started_at: i64, ended_at: i64, quality: i64) -> NewSleepSession {
        NewSleepSession {
            started_at: TimestampMs(started_at),
            ended_at: TimestampMs(ended_at),
            quality,
        }
    }

    #[test]
    fn migrates_fresh_database_to_latest_version() {
        let db_path = temp_db_path("fresh.sqlite");
        let mut connection =
            open_connection(db_path.to_string_lossy().as_ref()).expect("db connection should open");

        run_migrations(&mut connection).expect("migrations should succeed");

        let version = schema_version(&connection).expect("schema version should be queryable");
        assert_eq!(version, LATEST_SCHEMA_VERSION);

        let table_exists: i64 = connection
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='sleep_sessions'",
                [],
                |row| row.get(0),
            )
            .expect("sessions table check should work");
        assert_eq!(table_exists, 1);

        let index_exists: i64 = connection
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='index' AND name='idx_sleep_sessions_id_desc'",
                [],
                |row| row.get(0),
            )
            .expect("sessions index check should work");
        assert_eq!(index_exists, 1);
    }

    #[test]
    fn migrations_are_idempotent() {
        let db_path = temp_db_path("idempotent.sqlite");
        let mut connection =
            open_connection(db_path.to_string_lossy().as_ref()).expect("db connection should open");

        run_migrations(&mut connection).expect("first migration run should succeed");
        run_migrations(&mut connection).expect("second migration run should succeed");

        let version = schema_version(&connection).expect("schema version should be queryable");
        assert_eq!(version, LATEST_SCHEMA_VERSION);
    }

    #[test]
    fn keeps_existing_data_when_migrations_rerun() {
        let db_path = temp_db_path("rerun.sqlite");
        let mut connection =
            open_connection(db_path.to_string_lossy().as_ref()).expect("db connection should open");

        run_migrations(&mut connection).expect("first migration run should succeed");

        insert_session(&connection, &new_session(1_000, 9_000, 3)).expect("insert should succeed");

        run_migrations(&mut connection).expect("second migration run should succeed");

        let count = count_sessions(&connection).expect("count query should succeed");
        assert_eq!(count, 1);
    }

    #[test]
    fn returns_none_for_latest_session_when_empty() {
        let db_path = temp_db_path("latest-empty.sqlite");
        let mut connection =
            open_connection(db_path.to_string_lossy().as_ref()).expect("db connection should open");
        run_migrations(&mut connection).expect("migrations should succeed");

        let latest = get_latest_session(&connection).expect("query should succeed");
        assert_eq!(latest, None);
    }

    #[test]
    fn assigns_increasing_ids_on_insert() {
        let db_path = temp_db_path("ids.sqlite");
        let mut connection =
            open_connection(db_path.to_string_lossy().as_ref()).expect("db connection should open");
        run_migrations(&mut connection).expect("migrations should succeed");

        let first = insert_session(&connection, &new_session(1_000, 1_000, UNRATED_QUALITY))
            .expect("insert should succeed");
        let second = insert_session(&connection, &new_session(2_000, 2_000, UNRATED_QUALITY))
            .expect("insert should succeed");

        assert!(second > first);

        let latest = get_latest_session(&connection)
            .expect("query should succeed")
            .expect("session should exist");
        assert_eq!(latest.id, second);
    }

    #[test]
    fn round_trips_quality_and_bounds_by_id() {
        let db_path = temp_db_path("roundtrip.sqlite");
        let mut connection =
            open_connection(db_path.to_string_lossy().as_ref()).expect("db connection should open");
        run_migrations(&mut connection).expect("migrations should succeed");

        let inserted_id = insert_session(&connection, &new_session(1_700_000_000_000, 1_700_000_060_000, 2))
            .expect("insert should succeed");

        let fetched = get_session(&connection, inserted_id)
            .expect("query should succeed")
            .expect("session should exist");

        assert_eq!(fetched.id, inserted_id);
        assert_eq!(fetched.quality, 2);
        assert_eq!(fetched.started_at, TimestampMs(1_700_000_000_000));
        assert_eq!(fetched.ended_at, TimestampMs(1_700_000_060_000));
    }

    #[test]
    fn update_overwrites_the_full_row() {
        let db_path = temp_db_path("update.sqlite");
        let mut connection =
            open_connection(db_path.to_string_lossy().as_ref()).expect("db connection should open");
        run_migrations(&mut connection).expect("migrations should succeed");

        let inserted_id = insert_session(&connection, &new_session(1_000, 1_000, UNRATED_QUALITY))
            .expect("insert should succeed");

        let mut session = get_session(&connection, inserted_id)
            .expect("query should succeed")
            .expect("session should exist");
        session.ended_at = TimestampMs(9_000);
        session.quality = 5;

        update_session(&connection, &session).expect("update should succeed");

        let fetched = get_session(&connection, inserted_id)
            .expect("query should succeed")
            .expect("session should exist");
        assert_eq!(fetched.started_at, TimestampMs(1_000));
        assert_eq!(fetched.ended_at, TimestampMs(9_000));
        assert_eq!(fetched.quality, 5);
    }

    #[test]
    fn lists_sessions_newest_first_with_limit_and_offset() {
        let db_path = temp_db_path("list.sqlite");
        let mut connection =
            open_connection(db_path.to_string_lossy().as_ref()).expect("db connection should open");
        run_migrations(&mut connection).expect("migrations should succeed");

        for offset_ms in [0, 60_000, 120_000] {
            let started = 1_700_000_000_000 + offset_ms;
            insert_session(&connection, &new_session(started, started + 30_000, UNRATED_QUALITY))
                .expect("insert should succeed");
        }

        let all = list_all_sessions(&connection).expect("query should succeed");
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].started_at, TimestampMs(1_700_000_120_000));
        assert_eq!(all[2].started_at, TimestampMs(1_700_000_000_000));

        let page = list_sessions(&connection, 2, 1).expect("query should succeed");
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].started_at, TimestampMs(1_700_000_060_000));
        assert_eq!(page[1].started_at, TimestampMs(1_700_000_000_000));
    }

    #[test]
    fn clear_removes_every_row() {
        let db_path = temp_db_path("clear.sqlite");
        let mut connection =
            open_connection(db_path.to_string_lossy().as_ref()).expect("db connection should open");
        run_migrations(&mut connection).expect("migrations should succeed");

        insert_session(&connection, &new_session(1_000, 9_000, 3)).expect("insert should succeed");
        insert_session(&connection, &new_session(10_000, 10_000, UNRATED_QUALITY))
            .expect("insert should succeed");

        let removed = clear_sessions(&connection).expect("clear should succeed");
        assert_eq!(removed, 2);

        let count = count_sessions(&connection).expect("count query should succeed");
        assert_eq!(count, 0);
        assert_eq!(
            list_all_sessions(&connection).expect("query should succeed"),
            Vec::new()
        );
    }
}
