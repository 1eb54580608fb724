//! # IPN server
//! This crate hosts the HTTP surface of the IPN service. It is responsible for:
//! * Listening for Instant Payment Notifications from PayPal.
//! * Handing the raw body to the [`ipn_engine`] for verification and reconciliation.
//! * Translating the outcome into the status codes and body literals that PayPal expects.
//! * Turning ledger events into thank-you and reversal mails.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/paypal`: The IPN listener. Only `POST` is accepted; other methods get 405.

pub mod cli;
pub mod config;
pub mod errors;

pub mod helpers;
pub mod notifications;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
