use std::str::FromStr;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};

const SCHEMA: [&str; 7] = [
    r#"
    CREATE TABLE IF NOT EXISTS attendance_records (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        employee_id INTEGER NOT NULL,
        kind TEXT NOT NULL,
        recorded_at INTEGER NOT NULL,
        synced INTEGER NOT NULL DEFAULT 0
    )
    "#,
    r#"CREATE INDEX IF NOT EXISTS idx_attendance_synced ON attendance_records (synced, recorded_at)"#,
    r#"
    CREATE TABLE IF NOT EXISTS employees (
        id INTEGER PRIMARY KEY,
        business_code TEXT NOT NULL,
        name TEXT NOT NULL,
        position TEXT NOT NULL,
        is_active INTEGER NOT NULL DEFAULT 1,
        avatar TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS employee_operations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        op_type TEXT NOT NULL,
        employee_id INTEGER NOT NULL,
        snapshot TEXT NOT NULL,
        recorded_at INTEGER NOT NULL,
        synced INTEGER NOT NULL DEFAULT 0
    )
    "#,
    r#"CREATE INDEX IF NOT EXISTS idx_operations_synced ON employee_operations (synced, recorded_at)"#,
    r#"CREATE INDEX IF NOT EXISTS idx_operations_employee ON employee_operations (employee_id)"#,
    r#"
    CREATE TABLE IF NOT EXISTS employee_id_remaps (
        temporary_id INTEGER PRIMARY KEY,
        real_id INTEGER NOT NULL
    )
    "#,
];

/// Opens the local database and makes sure the tables exist.
///
/// Writes use `synchronous = FULL` so a returned write is on disk. An in-memory
/// url gets a single pinned connection, otherwise every new connection would
/// see its own empty database.
pub async fn init_db(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .synchronous(SqliteSynchronous::Full);

    let pool = if database_url.contains(":memory:") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?
    } else {
        SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options.journal_mode(SqliteJournalMode::Wal))
            .await?
    };

    for statement in SCHEMA {
        sqlx::query(statement).execute(&pool).await?;
    }

    Ok(pool)
}
