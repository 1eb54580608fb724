//! The public engine API.
//!
//! * [`reconciliation_api::ReconciliationApi`] applies a parsed notification to the ledger.
//! * [`notification_flow_api::NotificationFlowApi`] is what a transport binding calls: it verifies the raw
//!   notification with the processor, parses it, and hands it to reconciliation.
pub mod errors;
pub mod notification_flow_api;
pub mod outcome;
pub mod reconciliation_api;
