use serde::Serialize;

use crate::db_types::{Addon, Contribution};

/// Published when a pending purchase is completed by its IPN and the add-on wants to thank the payer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PurchaseCompletedEvent {
    pub contribution: Contribution,
    pub addon: Addon,
    /// The payer's address (`sender_email`), if the notification carried one.
    pub payer_email: Option<String>,
}

impl PurchaseCompletedEvent {
    pub fn new(contribution: Contribution, addon: Addon, payer_email: Option<String>) -> Self {
        Self { contribution, addon, payer_email }
    }
}

/// Published when a refund or chargeback is linked to a purchase of an add-on that asked to be told about them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReversalRecordedEvent {
    pub reversal: Contribution,
    pub original: Contribution,
    pub addon: Addon,
    pub support_email: String,
}

impl ReversalRecordedEvent {
    pub fn new(reversal: Contribution, original: Contribution, addon: Addon, support_email: String) -> Self {
        Self { reversal, original, addon, support_email }
    }
}
