//! #  Ledger management and control.
//!
//! This module provides the interface contracts of the contribution ledger *backends*.
//!
//! * [`LedgerManagement`] provides read-only queries for contributions and the add-on catalog.
//! * [`LedgerDatabase`] provides the writes that reconciliation needs. Every write is atomic with respect to
//!   concurrent deliveries of the same notification, so a redelivered IPN can never complete a purchase twice or
//!   create a second refund for the same purchase.
//!
//! Miss counters live behind their own trait, [`crate::MissCounter`], since they can be kept in process memory as
//! well as in the database.
mod data_objects;
mod ledger_database;
mod ledger_management;

pub use data_objects::{PurchaseCompletionResult, ReversalResult};
pub use ledger_database::LedgerDatabase;
pub use ledger_management::LedgerManagement;
