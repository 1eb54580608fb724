use std::fmt::Debug;

use chrono::Duration;
use log::*;
use sqlx::SqlitePool;

use super::{addons, contributions, db_url, immediate::ImmediateTransaction, miss_counters, new_pool, SqliteDatabaseError};
use crate::{
    db::traits::{LedgerDatabase, LedgerManagement, PurchaseCompletionResult, ReversalResult},
    db_types::{Addon, Contribution, ContributionKind, NewAddon, NewContribution, NewReversal, PurchaseCompletion},
    idempotency::{default_miss_window, MissCounter},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
    miss_window: Duration,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the URL in `IPN_DATABASE_URL`
    pub async fn new(max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        let pool = new_pool(url, max_connections).await?;
        trace!("🗃️ Created new SQLite pool for {url}");
        Ok(Self { url: url.to_string(), pool, miss_window: default_miss_window() })
    }

    /// Sets the window after which miss counters stored in this database expire.
    pub fn with_miss_window(mut self, window: Duration) -> Self {
        self.miss_window = window;
        self
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Applies the embedded schema migrations.
    pub async fn migrate(&self) -> Result<(), SqliteDatabaseError> {
        sqlx::migrate!("./src/db/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    /// Adds an entry to the add-on catalog. The catalog is owned elsewhere; this exists for seeding and tests.
    pub async fn insert_addon(&self, addon: NewAddon) -> Result<Addon, SqliteDatabaseError> {
        let mut tx = self.pool.begin().await?;
        let addon = addons::insert_addon(addon, &mut tx).await?;
        tx.commit().await?;
        Ok(addon)
    }

    /// Closes the pool. Clones of this database share the pool and are closed too.
    pub async fn close(&mut self) -> Result<(), SqliteDatabaseError> {
        self.pool.close().await;
        Ok(())
    }
}

impl LedgerManagement for SqliteDatabase {
    type Error = SqliteDatabaseError;

    async fn contribution_by_id(&self, id: i64) -> Result<Option<Contribution>, SqliteDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        contributions::fetch_contribution(id, &mut conn).await
    }

    async fn purchase_by_tracking_ref(&self, tracking_ref: &str) -> Result<Option<Contribution>, SqliteDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        contributions::fetch_purchase_by_tracking_ref(tracking_ref, &mut conn).await
    }

    async fn purchase_by_transaction_ref(&self, transaction_ref: &str) -> Result<Option<Contribution>, SqliteDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        contributions::fetch_purchase_by_transaction_ref(transaction_ref, &mut conn).await
    }

    async fn reversals_for(&self, purchase_id: i64) -> Result<Vec<Contribution>, SqliteDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        contributions::fetch_reversals(purchase_id, &mut conn).await
    }

    async fn contributions_by_kind(&self, kind: ContributionKind) -> Result<Vec<Contribution>, SqliteDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        contributions::fetch_by_kind(kind, &mut conn).await
    }

    async fn addon_by_id(&self, addon_id: i64) -> Result<Option<Addon>, SqliteDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        addons::fetch_addon(addon_id, &mut conn).await
    }
}

impl LedgerDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_contribution(&self, contribution: NewContribution) -> Result<Contribution, SqliteDatabaseError> {
        let mut tx = self.pool.begin().await?;
        let record = contributions::insert_contribution(contribution, &mut tx).await?;
        tx.commit().await?;
        Ok(record)
    }

    async fn complete_purchase(
        &self,
        tracking_ref: &str,
        completion: PurchaseCompletion,
    ) -> Result<PurchaseCompletionResult, SqliteDatabaseError> {
        let mut tx = self.pool.begin().await?;
        let result = contributions::complete_purchase(tracking_ref, completion, &mut tx).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn record_reversal(&self, reversal: NewReversal) -> Result<ReversalResult, SqliteDatabaseError> {
        let mut tx = ImmediateTransaction::begin(&self.pool).await?;
        let result = contributions::record_reversal(reversal, tx.connection()?).await;
        match result {
            Ok(result) => {
                tx.commit().await?;
                Ok(result)
            },
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!("🗃️ Could not roll back a failed reversal. {rollback_err}");
                }
                Err(e)
            },
        }
    }

    async fn record_subscription_event(
        &self,
        tracking_ref: Option<&str>,
        post_data: &str,
    ) -> Result<Contribution, SqliteDatabaseError> {
        let mut tx = self.pool.begin().await?;
        let record = contributions::insert_subscription_event(tracking_ref, post_data, &mut tx).await?;
        tx.commit().await?;
        Ok(record)
    }
}

impl MissCounter for SqliteDatabase {
    type Error = SqliteDatabaseError;

    async fn note_miss(&self, key: &str) -> Result<u64, SqliteDatabaseError> {
        let mut tx = self.pool.begin().await?;
        miss_counters::purge_expired(key, &mut tx).await?;
        let count = miss_counters::increment(key, self.miss_window, &mut tx).await?;
        tx.commit().await?;
        trace!("🗃️ Miss #{count} recorded for {key}");
        Ok(count)
    }

    async fn peek(&self, key: &str) -> Result<u64, SqliteDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        miss_counters::fetch_count(key, &mut conn).await
    }

    async fn clear(&self, key: &str) -> Result<(), SqliteDatabaseError> {
        let mut conn = self.pool.acquire().await?;
        miss_counters::remove(key, &mut conn).await
    }
}
