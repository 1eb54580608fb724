//! Inbound notification payloads.
//!
//! A notification arrives as a URL-encoded form body. [`RawNotification`] keeps the exact bytes (the processor only
//! verifies a byte-identical replay) alongside the decoded pairs in the order they were received.
//! [`ParsedNotification`] groups `transaction[N].field` keys by transaction index and leaves everything else at the
//! top level.
mod parser;
mod raw;

pub use parser::{ParsedNotification, TransactionFields};
pub use raw::RawNotification;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotificationError {
    #[error("Notification body cannot be decoded as form data. {0}")]
    MalformedNotification(String),
}
