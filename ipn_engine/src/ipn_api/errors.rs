use ipn_common::MoneyParseError;
use thiserror::Error;

use crate::{notification::NotificationError, verification::VerificationError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconciliationError {
    /// The ledger record the notification refers to does not exist (yet). The processor is expected to redeliver.
    #[error("Contribution not found for tracking id '{0}'")]
    ContributionNotFound(String),
    #[error("Payment notification has no tracking id")]
    MissingTrackingId,
    #[error("Transaction amount is missing or malformed. {0}")]
    MalformedAmount(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Could not update the miss counter: {0}")]
    MissCounterError(String),
}

impl From<MoneyParseError> for ReconciliationError {
    fn from(e: MoneyParseError) -> Self {
        Self::MalformedAmount(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IpnError {
    /// The processor did not confirm the notification. Nothing was written.
    #[error("Notification was not verified by the processor. It said: '{0}'")]
    Unverified(String),
    #[error("Could not verify notification. {0}")]
    VerificationFailed(#[from] VerificationError),
    #[error("{0}")]
    MalformedNotification(#[from] NotificationError),
    #[error("{0}")]
    Reconciliation(#[from] ReconciliationError),
}
