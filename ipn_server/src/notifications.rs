//! Mail side effects of reconciliation.
//!
//! The engine publishes an event when a purchase completes or a refund or chargeback is recorded. The hooks in this
//! module turn those events into mail messages. Delivery is out of scope for the server, so messages are written to
//! the log under the `ipn::mail` target, where an outbound relay can pick them up.
use std::{future::Future, pin::Pin};

use ipn_engine::events::{EventHooks, PurchaseCompletedEvent, ReversalRecordedEvent};
use log::*;
use serde::Serialize;

const MAIL_TARGET: &str = "ipn::mail";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// The thank-you note for the payer of a completed purchase. There is nobody to thank if the notification did not
/// carry the payer's address.
pub fn thankyou_mail(event: &PurchaseCompletedEvent) -> Option<MailMessage> {
    let to = event.payer_email.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
    let addon = &event.addon;
    let note = addon
        .thankyou_note
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(String::from)
        .unwrap_or_else(|| format!("Thank you for supporting {}!", addon.name));
    Some(MailMessage {
        to: to.to_string(),
        subject: format!("Thank you for your contribution to {}", addon.name),
        body: format!("{note}\n\nAmount: {}\n", event.contribution.amount),
    })
}

/// The notice to an add-on's support address that one of its purchases was refunded or charged back.
pub fn reversal_mail(event: &ReversalRecordedEvent) -> MailMessage {
    let reversal = &event.reversal;
    let original = &event.original;
    let transaction = original.transaction_ref.as_deref().unwrap_or("unknown");
    MailMessage {
        to: event.support_email.clone(),
        subject: format!("{} received for {}", reversal.kind, event.addon.name),
        body: format!(
            "A {} of {} was recorded against contribution #{} (transaction {transaction}) for {}.\n",
            reversal.kind.to_string().to_lowercase(),
            reversal.amount,
            original.id,
            event.addon.name
        ),
    }
}

fn send(message: MailMessage) {
    match serde_json::to_string(&message) {
        Ok(json) => info!(target: MAIL_TARGET, "{json}"),
        Err(e) => error!("📬️ Could not serialize mail to {}. {e}", message.to),
    }
}

pub fn mail_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks
        .on_purchase_completed(|ev| {
            Box::pin(async move {
                match thankyou_mail(&ev) {
                    Some(mail) => {
                        debug!("📬️ Sending thank-you note for contribution #{}", ev.contribution.id);
                        send(mail);
                    },
                    None => debug!("📬️ No payer address for contribution #{}. Not sending thanks.", ev.contribution.id),
                }
            }) as Pin<Box<dyn Future<Output = ()> + Send>>
        })
        .on_reversal_recorded(|ev| {
            Box::pin(async move {
                debug!("📬️ Notifying {} of {} #{}", ev.support_email, ev.reversal.kind, ev.reversal.id);
                send(reversal_mail(&ev));
            }) as Pin<Box<dyn Future<Output = ()> + Send>>
        });
    hooks
}
