use std::fmt::Display;

use crate::db_types::Contribution;

/// How a verified notification was handled. Every variant is a success as far as the processor is concerned.
#[derive(Debug, Clone, PartialEq)]
pub enum IpnOutcome {
    SubscriptionRecorded(Contribution),
    /// The first transaction had no status, or one that is not acted upon. Holds the tracking id.
    Ignored(String),
    /// An earlier delivery of this notification was already applied.
    AlreadyProcessed,
    PurchaseCompleted(Contribution),
    /// A refund or chargeback was linked to its purchase.
    ReversalRecorded(Contribution),
    /// The referenced record never turned up after repeated deliveries. The notification is dropped. Holds the
    /// tracking id.
    Unresolvable(String),
}

impl IpnOutcome {
    pub const SUCCESS: &'static str = "Success!";
    pub const ALREADY_PROCESSED: &'static str = "Transaction already processed";
    pub const UNRESOLVABLE: &'static str = "Transaction not found; skipping.";

    /// The literal response body the processor expects for this outcome.
    pub fn response_body(&self) -> String {
        match self {
            IpnOutcome::SubscriptionRecorded(_) | IpnOutcome::PurchaseCompleted(_) | IpnOutcome::ReversalRecorded(_) => {
                Self::SUCCESS.to_string()
            },
            IpnOutcome::Ignored(tracking_id) => format!("Ignoring {tracking_id}"),
            IpnOutcome::AlreadyProcessed => Self::ALREADY_PROCESSED.to_string(),
            IpnOutcome::Unresolvable(_) => Self::UNRESOLVABLE.to_string(),
        }
    }
}

impl Display for IpnOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IpnOutcome::SubscriptionRecorded(c) => write!(f, "subscription event #{} recorded", c.id),
            IpnOutcome::Ignored(t) => write!(f, "notification [{t}] ignored"),
            IpnOutcome::AlreadyProcessed => write!(f, "already processed"),
            IpnOutcome::PurchaseCompleted(c) => write!(f, "purchase #{} completed", c.id),
            IpnOutcome::ReversalRecorded(c) => write!(f, "{} #{} recorded", c.kind, c.id),
            IpnOutcome::Unresolvable(t) => write!(f, "notification [{t}] could not be resolved and was dropped"),
        }
    }
}
