use thiserror::Error;

use crate::db_types::ContributionKind;

#[derive(Debug, Error)]
pub enum SqliteDatabaseError {
    #[error("Database connection error: {0}")]
    DriverError(#[from] sqlx::Error),
    #[error("Could not run database migrations: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),
    #[error("Only refunds and chargebacks can be linked to a purchase, not a {0}")]
    NotAReversal(ContributionKind),
}
