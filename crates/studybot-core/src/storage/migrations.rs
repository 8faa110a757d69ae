//! Database schema migrations for studybot.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 2;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (initial database).
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            tracing::warn!("failed to read schema_version: {e}");
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: study ledger, timers, challenges and quizzes.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS study_sessions (
            user_id          INTEGER NOT NULL,
            channel_id       INTEGER NOT NULL,
            check_in_time    TEXT,
            total_study_time REAL NOT NULL DEFAULT 0,
            daily_study_time REAL NOT NULL DEFAULT 0,
            goal             INTEGER,
            PRIMARY KEY (user_id, channel_id)
        );

        CREATE TABLE IF NOT EXISTS daily_study (
            user_id     INTEGER NOT NULL,
            channel_id  INTEGER NOT NULL,
            date        TEXT NOT NULL,
            study_time  REAL NOT NULL DEFAULT 0,
            PRIMARY KEY (user_id, channel_id, date)
        );

        CREATE TABLE IF NOT EXISTS pomodoro_timers (
            user_id       INTEGER PRIMARY KEY,
            start_time    TEXT NOT NULL,
            study_time    INTEGER NOT NULL,
            break_time    INTEGER NOT NULL,
            cycles        INTEGER NOT NULL,
            current_cycle INTEGER NOT NULL DEFAULT 0,
            on_break      INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS challenges (
            id                  TEXT PRIMARY KEY,
            channel_id          INTEGER NOT NULL,
            original_channel_id INTEGER,
            message_id          INTEGER NOT NULL,
            end_time            TEXT NOT NULL,
            participants        TEXT NOT NULL DEFAULT '[]'
        );

        CREATE TABLE IF NOT EXISTS quiz_bank (
            id       INTEGER PRIMARY KEY AUTOINCREMENT,
            question TEXT NOT NULL,
            options  TEXT NOT NULL,
            answer   INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS active_quizzes (
            message_id  INTEGER PRIMARY KEY,
            channel_id  INTEGER NOT NULL,
            quiz        TEXT NOT NULL,
            start_time  TEXT NOT NULL,
            answered_by TEXT NOT NULL DEFAULT '[]'
        );

        CREATE TABLE IF NOT EXISTS user_answers (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id     INTEGER NOT NULL,
            quiz_id     INTEGER NOT NULL,
            correct     INTEGER NOT NULL,
            answered_at TEXT NOT NULL
        );",
    )?;

    set_schema_version(&tx, 1)?;
    tx.commit()
}

/// Migration v2: level cache and sweep/report indexes.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS user_levels (
            user_id    INTEGER PRIMARY KEY,
            xp         REAL NOT NULL,
            level      INTEGER NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_challenges_end_time ON challenges(end_time);
        CREATE INDEX IF NOT EXISTS idx_active_quizzes_start_time ON active_quizzes(start_time);
        CREATE INDEX IF NOT EXISTS idx_user_answers_user ON user_answers(user_id);
        CREATE INDEX IF NOT EXISTS idx_study_sessions_total ON study_sessions(channel_id, total_study_time);",
    )?;

    set_schema_version(&tx, 2)?;
    tx.commit()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrate_from_scratch() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), SCHEMA_VERSION);

        for table in [
            "study_sessions",
            "daily_study",
            "pomodoro_timers",
            "challenges",
            "quiz_bank",
            "active_quizzes",
            "user_answers",
            "user_levels",
        ] {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "missing table {table}");
        }
    }

    #[test]
    fn test_migrate_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn), SCHEMA_VERSION);
    }

    #[test]
    fn test_incremental_migration_keeps_data() {
        let conn = Connection::open_in_memory().unwrap();
        create_schema_version_table(&conn).unwrap();
        migrate_v1(&conn).unwrap();
        conn.execute(
            "INSERT INTO study_sessions (user_id, channel_id, total_study_time) VALUES (1, 2, 30.0)",
            [],
        )
        .unwrap();

        migrate(&conn).unwrap();

        assert_eq!(get_schema_version(&conn), 2);
        let total: f64 = conn
            .query_row(
                "SELECT total_study_time FROM study_sessions WHERE user_id = 1",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(total, 30.0);
    }
}
