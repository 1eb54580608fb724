//! Authenticity checks for inbound notifications.
//!
//! Anyone can post to the notification endpoint, so every notification is replayed to the processor, which answers
//! with a single status line. Only the literal `VERIFIED` means the notification is genuine. A failure of the check
//! itself (network errors, timeouts, server errors) is reported as a [`VerificationError`], never as "unverified".
mod paypal;

pub use paypal::{PaypalVerifier, DEFAULT_VERIFY_URL, VALIDATE_COMMAND};
use thiserror::Error;

use crate::notification::RawNotification;

pub const VERIFIED_TOKEN: &str = "VERIFIED";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationStatus {
    Verified,
    /// The processor did not vouch for the notification. Holds the status line it returned instead.
    Unverified(String),
}

impl VerificationStatus {
    /// Classifies the processor's response body. Only the first line counts and a trailing `\r` is ignored.
    pub fn from_response(body: &str) -> Self {
        let line = body.split('\n').next().unwrap_or_default().trim_end_matches('\r');
        if line == VERIFIED_TOKEN {
            Self::Verified
        } else {
            Self::Unverified(line.to_string())
        }
    }

    pub fn is_verified(&self) -> bool {
        matches!(self, Self::Verified)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    #[error("Could not reach the verification endpoint. {0}")]
    Transport(String),
    #[error("The verification endpoint returned HTTP status {0}")]
    UnexpectedStatus(u16),
    #[error("The verification request timed out")]
    Timeout,
}

/// Checks with the processor that a notification is authentic.
#[allow(async_fn_in_trait)]
pub trait NotificationVerifier {
    /// Replays the notification to the processor. No retries are attempted here; the processor redelivers
    /// notifications that were not acknowledged.
    async fn verify(&self, notification: &RawNotification) -> Result<VerificationStatus, VerificationError>;
}
