use chrono::{Duration, Utc};
use sqlx::SqliteConnection;

use crate::{db::sqlite::SqliteDatabaseError, idempotency::window_expiry};

/// Removes `key` if its window has lapsed. Call this before [`increment`] so that an expired counter starts over.
pub async fn purge_expired(key: &str, conn: &mut SqliteConnection) -> Result<(), SqliteDatabaseError> {
    sqlx::query("DELETE FROM miss_counters WHERE key = $1 AND expires_at <= $2")
        .bind(key)
        .bind(Utc::now().timestamp())
        .execute(conn)
        .await?;
    Ok(())
}

/// Creates the counter with a count of 1, or bumps it. The expiry is only set on creation.
pub async fn increment(key: &str, window: Duration, conn: &mut SqliteConnection) -> Result<u64, SqliteDatabaseError> {
    let expires_at = window_expiry(Utc::now(), window).timestamp();
    let count: i64 = sqlx::query_scalar(
        "INSERT INTO miss_counters (key, count, expires_at) VALUES ($1, 1, $2) ON CONFLICT (key) DO UPDATE SET count = \
         count + 1 RETURNING count",
    )
    .bind(key)
    .bind(expires_at)
    .fetch_all(conn)
    .await?
    .into_iter()
    .next()
    .ok_or(sqlx::Error::RowNotFound)?;
    Ok(count.max(0) as u64)
}

pub async fn fetch_count(key: &str, conn: &mut SqliteConnection) -> Result<u64, SqliteDatabaseError> {
    let count: Option<i64> = sqlx::query_scalar("SELECT count FROM miss_counters WHERE key = $1 AND expires_at > $2")
        .bind(key)
        .bind(Utc::now().timestamp())
        .fetch_optional(conn)
        .await?;
    Ok(count.unwrap_or(0).max(0) as u64)
}

pub async fn remove(key: &str, conn: &mut SqliteConnection) -> Result<(), SqliteDatabaseError> {
    sqlx::query("DELETE FROM miss_counters WHERE key = $1").bind(key).execute(conn).await?;
    Ok(())
}
