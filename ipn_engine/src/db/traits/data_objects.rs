use crate::db_types::Contribution;

#[derive(Debug, Clone, PartialEq)]
pub enum PurchaseCompletionResult {
    /// The purchase was pending and is now processed.
    Completed(Contribution),
    /// The purchase had already been processed by an earlier delivery. Nothing was changed.
    AlreadyProcessed(Contribution),
    NotFound,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReversalResult {
    Recorded { reversal: Contribution, original: Contribution },
    /// A refund or chargeback is already linked to the original purchase. Nothing was changed.
    AlreadyProcessed(Contribution),
    OriginalNotFound,
}
