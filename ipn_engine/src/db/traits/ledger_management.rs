use crate::db_types::{Addon, Contribution, ContributionKind};

/// The `LedgerManagement` trait defines the behaviour for querying contributions and add-ons in the database backend.
#[allow(async_fn_in_trait)]
pub trait LedgerManagement {
    type Error: std::error::Error;

    async fn contribution_by_id(&self, id: i64) -> Result<Option<Contribution>, Self::Error>;

    /// Fetches the purchase that was created for the given tracking reference.
    async fn purchase_by_tracking_ref(&self, tracking_ref: &str) -> Result<Option<Contribution>, Self::Error>;

    /// Fetches the purchase whose transaction reference matches. Refunds and chargebacks are linked to purchases
    /// through this reference.
    async fn purchase_by_transaction_ref(&self, transaction_ref: &str) -> Result<Option<Contribution>, Self::Error>;

    /// All refunds and chargebacks linked to the given purchase.
    async fn reversals_for(&self, purchase_id: i64) -> Result<Vec<Contribution>, Self::Error>;

    async fn contributions_by_kind(&self, kind: ContributionKind) -> Result<Vec<Contribution>, Self::Error>;

    async fn addon_by_id(&self, addon_id: i64) -> Result<Option<Addon>, Self::Error>;
}
