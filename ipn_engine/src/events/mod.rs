//! Simple stateless pub-sub hooks for ledger events.
//!
//! Reconciliation publishes an event after a purchase completes or a refund or chargeback is recorded. Hooks receive
//! only the event itself, never a handle to the engine, and run on their own tasks, so a slow or failing hook cannot
//! hold up the response to the processor.
mod channel;
mod event_types;
mod hooks;

pub use channel::{EventHandler, EventProducer, Handler};
pub use event_types::*;
pub use hooks::{EventHandlers, EventHooks, EventProducers};
