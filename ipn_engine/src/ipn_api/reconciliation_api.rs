use std::fmt::Debug;

use ipn_common::Money;
use log::*;

use crate::{
    db::traits::{LedgerDatabase, PurchaseCompletionResult, ReversalResult},
    db_types::{Contribution, ContributionKind, NewReversal, PurchaseCompletion},
    events::{EventProducers, PurchaseCompletedEvent, ReversalRecordedEvent},
    idempotency::{miss_key, MissCounter, DEFAULT_MISS_THRESHOLD},
    ipn_api::{errors::ReconciliationError, outcome::IpnOutcome},
    notification::ParsedNotification,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationOptions {
    /// Namespace for miss counter keys
    pub cache_prefix: String,
    /// A notification is dropped once its miss count goes past this value.
    pub miss_threshold: u64,
    /// Whether purchase notifications get the same miss tolerance as refunds. When `false`, a purchase that cannot
    /// be found fails straight away.
    pub tolerate_purchase_misses: bool,
}

impl Default for ReconciliationOptions {
    fn default() -> Self {
        Self { cache_prefix: String::new(), miss_threshold: DEFAULT_MISS_THRESHOLD, tolerate_purchase_misses: false }
    }
}

/// The payment statuses the engine acts on. Anything else is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PaymentStatus {
    Completed,
    Refunded,
    Reversal,
}

impl PaymentStatus {
    fn parse(status: &str) -> Option<Self> {
        match status.to_ascii_lowercase().as_str() {
            "completed" => Some(Self::Completed),
            "refunded" => Some(Self::Refunded),
            "reversal" => Some(Self::Reversal),
            _ => None,
        }
    }
}

/// `ReconciliationApi` applies verified notifications to the contribution ledger, exactly once.
///
/// Only the first transaction (`transaction[0]`) of a notification is reconciled.
pub struct ReconciliationApi<B, C> {
    db: B,
    misses: C,
    producers: EventProducers,
    options: ReconciliationOptions,
}

impl<B, C> Debug for ReconciliationApi<B, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReconciliationApi ({:?})", self.options)
    }
}

impl<B, C> ReconciliationApi<B, C> {
    pub fn new(db: B, misses: C, producers: EventProducers, options: ReconciliationOptions) -> Self {
        Self { db, misses, producers, options }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn miss_counter(&self) -> &C {
        &self.misses
    }

    pub fn options(&self) -> &ReconciliationOptions {
        &self.options
    }
}

impl<B, C> ReconciliationApi<B, C>
where
    B: LedgerDatabase,
    C: MissCounter,
{
    pub async fn reconcile(&self, notification: &ParsedNotification) -> Result<IpnOutcome, ReconciliationError> {
        if notification.is_subscription_event() {
            return self.record_subscription_event(notification).await;
        }
        let tracking_id = notification.tracking_id().unwrap_or_default();
        let status = match notification.transaction_field(0, "status") {
            Some(s) => s,
            None => {
                debug!("🔄️ Notification [{tracking_id}] has no payment status. Ignoring it.");
                return Ok(IpnOutcome::Ignored(tracking_id.to_string()));
            },
        };
        let status = match PaymentStatus::parse(status) {
            Some(s) => s,
            None => {
                debug!("🔄️ Notification [{tracking_id}] has status '{status}', which needs no action. Ignoring it.");
                return Ok(IpnOutcome::Ignored(tracking_id.to_string()));
            },
        };
        if tracking_id.is_empty() {
            warn!("🔄️ A {status:?} notification arrived without a tracking id");
            return Err(ReconciliationError::MissingTrackingId);
        }
        match status {
            PaymentStatus::Completed => self.complete_purchase(tracking_id, notification).await,
            PaymentStatus::Refunded => self.record_reversal(tracking_id, ContributionKind::Refund, notification).await,
            PaymentStatus::Reversal => {
                self.record_reversal(tracking_id, ContributionKind::Chargeback, notification).await
            },
        }
    }

    async fn record_subscription_event(
        &self,
        notification: &ParsedNotification,
    ) -> Result<IpnOutcome, ReconciliationError> {
        let record = self
            .db
            .record_subscription_event(notification.tracking_id(), &notification.to_post_data())
            .await
            .map_err(|e| ReconciliationError::DatabaseError(e.to_string()))?;
        info!("🔄️ Subscription event '{}' recorded as #{}", notification.txn_type().unwrap_or_default(), record.id);
        Ok(IpnOutcome::SubscriptionRecorded(record))
    }

    async fn complete_purchase(
        &self,
        tracking_id: &str,
        notification: &ParsedNotification,
    ) -> Result<IpnOutcome, ReconciliationError> {
        let amount = notification.transaction_field(0, "amount").map(str::parse::<Money>).transpose()?;
        let completion = PurchaseCompletion {
            transaction_ref: tracking_id.to_string(),
            amount,
            post_data: notification.to_post_data(),
        };
        let result = self
            .db
            .complete_purchase(tracking_id, completion)
            .await
            .map_err(|e| ReconciliationError::DatabaseError(e.to_string()))?;
        match result {
            PurchaseCompletionResult::NotFound => {
                self.handle_miss(tracking_id, self.options.tolerate_purchase_misses).await
            },
            PurchaseCompletionResult::AlreadyProcessed(purchase) => {
                info!("🔄️ Purchase #{} [{tracking_id}] was already processed", purchase.id);
                Ok(IpnOutcome::AlreadyProcessed)
            },
            PurchaseCompletionResult::Completed(purchase) => {
                self.clear_misses(tracking_id).await?;
                info!("🔄️💰️ Purchase #{} [{tracking_id}] of {} completed", purchase.id, purchase.amount);
                self.call_purchase_completed_hook(&purchase, notification.field("sender_email")).await;
                Ok(IpnOutcome::PurchaseCompleted(purchase))
            },
        }
    }

    async fn record_reversal(
        &self,
        tracking_id: &str,
        kind: ContributionKind,
        notification: &ParsedNotification,
    ) -> Result<IpnOutcome, ReconciliationError> {
        let amount = notification
            .transaction_field(0, "amount")
            .ok_or_else(|| ReconciliationError::MalformedAmount(format!("{kind} [{tracking_id}] has no amount")))?
            .parse::<Money>()?;
        // Reversals are stored as negative amounts, whichever sign the processor sent
        let amount = if amount.is_negative() { amount } else { -amount };
        let reversal = NewReversal {
            tracking_ref: Some(tracking_id.to_string()),
            transaction_ref: tracking_id.to_string(),
            kind,
            amount,
            post_data: notification.to_post_data(),
        };
        let result =
            self.db.record_reversal(reversal).await.map_err(|e| ReconciliationError::DatabaseError(e.to_string()))?;
        match result {
            ReversalResult::OriginalNotFound => self.handle_miss(tracking_id, true).await,
            ReversalResult::AlreadyProcessed(original) => {
                info!("🔄️ Purchase #{} [{tracking_id}] already has a {kind} linked to it", original.id);
                Ok(IpnOutcome::AlreadyProcessed)
            },
            ReversalResult::Recorded { reversal, original } => {
                self.clear_misses(tracking_id).await?;
                info!(
                    "🔄️💸️ {kind} #{} of {} recorded against purchase #{} [{tracking_id}]",
                    reversal.id, reversal.amount, original.id
                );
                self.call_reversal_recorded_hook(&reversal, &original).await;
                Ok(IpnOutcome::ReversalRecorded(reversal))
            },
        }
    }

    /// Handles a notification whose ledger record could not be found.
    ///
    /// Without tolerance, this fails immediately. With tolerance, the miss is counted and the notification fails
    /// (and gets redelivered) until the count goes past the threshold. At that point it is accepted and dropped.
    async fn handle_miss(&self, tracking_id: &str, tolerate: bool) -> Result<IpnOutcome, ReconciliationError> {
        if !tolerate {
            warn!("🔄️ No contribution matches notification [{tracking_id}]");
            return Err(ReconciliationError::ContributionNotFound(tracking_id.to_string()));
        }
        let key = miss_key(&self.options.cache_prefix, tracking_id);
        let count = self.misses.note_miss(&key).await.map_err(|e| ReconciliationError::MissCounterError(e.to_string()))?;
        if count > self.options.miss_threshold {
            error!(
                "🔄️ Notification [{tracking_id}] still has no matching contribution after {count} deliveries. \
                 Giving up on it."
            );
            self.misses.clear(&key).await.map_err(|e| ReconciliationError::MissCounterError(e.to_string()))?;
            return Ok(IpnOutcome::Unresolvable(tracking_id.to_string()));
        }
        warn!("🔄️ No contribution matches notification [{tracking_id}] yet (miss #{count}). Waiting for redelivery.");
        Err(ReconciliationError::ContributionNotFound(tracking_id.to_string()))
    }

    async fn clear_misses(&self, tracking_id: &str) -> Result<(), ReconciliationError> {
        let key = miss_key(&self.options.cache_prefix, tracking_id);
        self.misses.clear(&key).await.map_err(|e| ReconciliationError::MissCounterError(e.to_string()))
    }

    async fn call_purchase_completed_hook(&self, purchase: &Contribution, payer_email: Option<&str>) {
        if self.producers.purchase_completed_producer.is_empty() {
            return;
        }
        let addon = match purchase.addon_id {
            Some(id) => self.db.addon_by_id(id).await,
            None => return,
        };
        match addon {
            Ok(Some(addon)) if addon.enable_thankyou => {
                debug!("🔄️📬️ Notifying purchase completed hook subscribers");
                let event = PurchaseCompletedEvent::new(purchase.clone(), addon, payer_email.map(String::from));
                for producer in &self.producers.purchase_completed_producer {
                    producer.publish_event(event.clone()).await;
                }
            },
            Ok(_) => trace!("🔄️ No thank-you configured for purchase #{}", purchase.id),
            Err(e) => warn!("🔄️ Could not load the add-on for purchase #{}. No thank-you will be sent. {e}", purchase.id),
        }
    }

    async fn call_reversal_recorded_hook(&self, reversal: &Contribution, original: &Contribution) {
        if self.producers.reversal_recorded_producer.is_empty() {
            return;
        }
        let addon = match original.addon_id {
            Some(id) => self.db.addon_by_id(id).await,
            None => return,
        };
        match addon {
            Ok(Some(addon)) => {
                let Some(contact) = addon.reversal_contact().map(String::from) else {
                    trace!("🔄️ Add-on #{} does not want to hear about reversals", addon.id);
                    return;
                };
                debug!("🔄️📬️ Notifying reversal recorded hook subscribers");
                let event = ReversalRecordedEvent::new(reversal.clone(), original.clone(), addon, contact);
                for producer in &self.producers.reversal_recorded_producer {
                    producer.publish_event(event.clone()).await;
                }
            },
            Ok(None) => trace!("🔄️ Purchase #{} has no add-on on record", original.id),
            Err(e) => warn!("🔄️ Could not load the add-on for purchase #{}. No mail will be sent. {e}", original.id),
        }
    }
}
