use log::trace;
use sqlx::{Row, SqliteConnection};

use crate::db::sqlite::SqliteDatabaseError;

/// Creates the named counter starting at `start`. A no-op when the counter already exists.
pub async fn initialize(name: &str, start: i64, conn: &mut SqliteConnection) -> Result<(), SqliteDatabaseError> {
    let _ = sqlx::query("INSERT INTO counters (name, value) VALUES ($1, $2) ON CONFLICT (name) DO NOTHING")
        .bind(name)
        .bind(start)
        .execute(conn)
        .await?;
    Ok(())
}

/// Atomically increments the named counter and returns the new value. The single-statement
/// increment-and-return is the entire concurrency story here: there is no read-modify-write window for two callers
/// to observe the same value in.
pub async fn next_value(name: &str, conn: &mut SqliteConnection) -> Result<i64, SqliteDatabaseError> {
    let row = sqlx::query("UPDATE counters SET value = value + 1 WHERE name = $1 RETURNING value")
        .bind(name)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| SqliteDatabaseError::CounterNotFound(name.to_string()))?;
    let value: i64 = row.get(0);
    trace!("🔢️ Sequence {name} issued {value}");
    Ok(value)
}

/// Returns the last-issued value of the named counter without incrementing it.
pub async fn current_value(name: &str, conn: &mut SqliteConnection) -> Result<i64, SqliteDatabaseError> {
    let row = sqlx::query("SELECT value FROM counters WHERE name = $1")
        .bind(name)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| SqliteDatabaseError::CounterNotFound(name.to_string()))?;
    Ok(row.get(0))
}
