//! IPN Engine
//!
//! The IPN engine receives payment notifications ("IPNs") from the payment processor, checks that they really came
//! from the processor, and reconciles them against the contribution ledger exactly once, even though the processor
//! delivers every notification at least once.
//!
//! The library is divided into the following sections:
//! 1. Notification handling ([`mod@notification`]). The raw, order-preserving payload and the parser that turns it
//!    into top-level fields and indexed transactions.
//! 2. Authenticity checks ([`mod@verification`]). The raw payload is replayed to the processor, which answers
//!    `VERIFIED` or something else.
//! 3. Database management and control (`db`). The ledger is accessed through the [`LedgerManagement`],
//!    [`LedgerDatabase`] and [`MissCounter`] traits. SQLite is the supported backend. The data types used in the
//!    database are defined in [`mod@db_types`] and are public.
//! 4. The public API (`ipn_api`). [`ReconciliationApi`] is the state machine that applies a parsed notification to
//!    the ledger, and [`NotificationFlowApi`] strings verification, parsing and reconciliation together.
//!
//! The engine also emits events when a purchase completes or a refund or chargeback is recorded. Mail side effects
//! hook into these (see [`mod@events`]).
mod db;

pub mod db_types;
pub mod events;
pub mod idempotency;
mod ipn_api;
pub mod notification;
pub mod verification;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use db::sqlite::{SqliteDatabase, SqliteDatabaseError};
pub use db::traits::{LedgerDatabase, LedgerManagement, PurchaseCompletionResult, ReversalResult};
pub use idempotency::{MemoryMissCounter, MissCounter};
pub use ipn_api::{
    errors::{IpnError, ReconciliationError},
    notification_flow_api::NotificationFlowApi,
    outcome::IpnOutcome,
    reconciliation_api::{ReconciliationApi, ReconciliationOptions},
};
pub use verification::{NotificationVerifier, PaypalVerifier, VerificationError, VerificationStatus};
