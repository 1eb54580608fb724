use log::*;
use sqlx::{pool::PoolConnection, Sqlite, SqliteConnection, SqlitePool};

use super::SqliteDatabaseError;

/// A pooled connection holding an open `BEGIN IMMEDIATE` transaction.
///
/// The write lock is taken when the transaction starts, so a read followed by a write cannot be overtaken by another
/// writer. If the guard is dropped without [`commit`](Self::commit) or [`rollback`](Self::rollback), the connection is
/// detached from the pool and closed, which rolls the transaction back.
pub struct ImmediateTransaction {
    conn: Option<PoolConnection<Sqlite>>,
}

impl ImmediateTransaction {
    pub async fn begin(pool: &SqlitePool) -> Result<Self, SqliteDatabaseError> {
        let mut conn = pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;
        Ok(Self { conn: Some(conn) })
    }

    pub fn connection(&mut self) -> Result<&mut SqliteConnection, SqliteDatabaseError> {
        self.conn.as_deref_mut().ok_or(SqliteDatabaseError::DriverError(sqlx::Error::PoolClosed))
    }

    pub async fn commit(mut self) -> Result<(), SqliteDatabaseError> {
        self.finish("COMMIT").await
    }

    pub async fn rollback(mut self) -> Result<(), SqliteDatabaseError> {
        self.finish("ROLLBACK").await
    }

    async fn finish(&mut self, statement: &str) -> Result<(), SqliteDatabaseError> {
        sqlx::query(statement).execute(self.connection()?).await?;
        // Back to the pool with no transaction open
        self.conn = None;
        Ok(())
    }
}

impl Drop for ImmediateTransaction {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            warn!("🗃️ An immediate transaction was abandoned before it finished. Closing its connection.");
            drop(conn.detach());
        }
    }
}
