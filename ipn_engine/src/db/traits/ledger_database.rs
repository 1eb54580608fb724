use super::{LedgerManagement, PurchaseCompletionResult, ReversalResult};
use crate::db_types::{Contribution, NewContribution, NewReversal, PurchaseCompletion};

/// This trait defines the writes that notification reconciliation makes to the ledger.
///
/// Implementations must make each operation atomic with respect to concurrent calls that share the same tracking or
/// transaction reference.
#[allow(async_fn_in_trait)]
pub trait LedgerDatabase: Clone + LedgerManagement {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Stores a new contribution. This is how the purchase-initiation flow pre-creates pending purchases.
    async fn insert_contribution(&self, contribution: NewContribution) -> Result<Contribution, Self::Error>;

    /// Marks the pending purchase with the given tracking reference as processed, in a single atomic step.
    ///
    /// * If no purchase carries the tracking reference, `NotFound` is returned.
    /// * If the purchase was processed before, it is returned untouched as `AlreadyProcessed`.
    /// * Otherwise `processed_at`, the transaction reference, the post data and (when given) the amount are set and
    ///   the updated record is returned.
    async fn complete_purchase(
        &self,
        tracking_ref: &str,
        completion: PurchaseCompletion,
    ) -> Result<PurchaseCompletionResult, Self::Error>;

    /// Links a new refund or chargeback to the purchase whose transaction reference is `reversal.transaction_ref`.
    ///
    /// The add-on and user are copied from the original. At most one refund or chargeback can ever be linked to a
    /// purchase; a second attempt returns `AlreadyProcessed`.
    async fn record_reversal(&self, reversal: NewReversal) -> Result<ReversalResult, Self::Error>;

    /// Stores a subscription lifecycle notification. These are not linked to any other record.
    async fn record_subscription_event(
        &self,
        tracking_ref: Option<&str>,
        post_data: &str,
    ) -> Result<Contribution, Self::Error>;
}
