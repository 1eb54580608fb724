use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use ipn_common::Money;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

//--------------------------------------   ContributionKind    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum ContributionKind {
    /// Money received for an add-on. Purchases are created by the purchase-initiation flow and completed by an IPN.
    Purchase,
    /// A merchant-initiated refund of a purchase.
    Refund,
    /// A processor-initiated forced refund (reversal) of a purchase.
    Chargeback,
    /// A subscription lifecycle notification. These are recorded, but never linked to other records.
    SubscriptionEvent,
}

impl ContributionKind {
    /// True for the kinds that reverse a purchase, i.e. `Refund` and `Chargeback`.
    pub fn is_reversal(&self) -> bool {
        matches!(self, Self::Refund | Self::Chargeback)
    }
}

impl Display for ContributionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContributionKind::Purchase => write!(f, "Purchase"),
            ContributionKind::Refund => write!(f, "Refund"),
            ContributionKind::Chargeback => write!(f, "Chargeback"),
            ContributionKind::SubscriptionEvent => write!(f, "SubscriptionEvent"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid contribution kind: {0}")]
pub struct ConversionError(String);

impl FromStr for ContributionKind {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Purchase" => Ok(Self::Purchase),
            "Refund" => Ok(Self::Refund),
            "Chargeback" => Ok(Self::Chargeback),
            "SubscriptionEvent" => Ok(Self::SubscriptionEvent),
            s => Err(ConversionError(s.to_string())),
        }
    }
}

//--------------------------------------     Contribution      ---------------------------------------------------------
/// A ledger record of money moving in (a purchase) or out (a refund or chargeback) for an add-on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contribution {
    pub id: i64,
    /// The processor's tracking id for the payment session that created this record. Pre-created purchases carry
    /// it; the completing IPN is matched on it.
    pub tracking_ref: Option<String>,
    /// Set when a purchase is completed. Refund and reversal IPNs are linked to the purchase through it.
    pub transaction_ref: Option<String>,
    pub addon_id: Option<i64>,
    pub user_id: Option<i64>,
    pub amount: Money,
    pub kind: ContributionKind,
    /// For refunds and chargebacks, the purchase being reversed.
    pub related_id: Option<i64>,
    /// JSON copy of the last notification that touched this record
    pub post_data: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contribution {
    pub fn is_processed(&self) -> bool {
        self.processed_at.is_some()
    }
}

//--------------------------------------    NewContribution    ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq)]
pub struct NewContribution {
    pub tracking_ref: Option<String>,
    pub transaction_ref: Option<String>,
    pub addon_id: Option<i64>,
    pub user_id: Option<i64>,
    pub amount: Money,
    pub kind: ContributionKind,
}

impl NewContribution {
    /// A pending purchase, as the purchase-initiation flow would create it before the processor reports back.
    pub fn purchase(addon_id: i64, amount: Money) -> Self {
        Self {
            tracking_ref: None,
            transaction_ref: None,
            addon_id: Some(addon_id),
            user_id: None,
            amount,
            kind: ContributionKind::Purchase,
        }
    }

    pub fn with_tracking_ref<S: Into<String>>(mut self, tracking_ref: S) -> Self {
        self.tracking_ref = Some(tracking_ref.into());
        self
    }

    pub fn with_transaction_ref<S: Into<String>>(mut self, transaction_ref: S) -> Self {
        self.transaction_ref = Some(transaction_ref.into());
        self
    }

    pub fn with_user(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }
}

//--------------------------------------  PurchaseCompletion   ---------------------------------------------------------
/// The values written to a pending purchase when its `completed` IPN arrives.
#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseCompletion {
    pub transaction_ref: String,
    /// The settled amount, if the notification carried one. Otherwise the pre-created amount is kept.
    pub amount: Option<Money>,
    pub post_data: String,
}

//--------------------------------------      NewReversal      ---------------------------------------------------------
/// A refund or chargeback to be linked to the purchase identified by `transaction_ref`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReversal {
    /// The tracking id of the refund notification itself
    pub tracking_ref: Option<String>,
    pub transaction_ref: String,
    pub kind: ContributionKind,
    /// Already negated, i.e. `-0.01 USD` for a refund of `USD 0.01`.
    pub amount: Money,
    pub post_data: String,
}

//--------------------------------------        Addon          ---------------------------------------------------------
/// The slice of the add-on catalog that the engine needs to decide on side effects.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Addon {
    pub id: i64,
    pub name: String,
    pub support_email: Option<String>,
    pub enable_thankyou: bool,
    pub thankyou_note: Option<String>,
    pub notify_reversals: bool,
}

impl Addon {
    /// The support address to notify about refunds and chargebacks, if the add-on opted in.
    pub fn reversal_contact(&self) -> Option<&str> {
        if self.notify_reversals {
            self.support_email.as_deref().filter(|s| !s.trim().is_empty())
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewAddon {
    pub name: String,
    pub support_email: Option<String>,
    pub enable_thankyou: bool,
    pub thankyou_note: Option<String>,
    pub notify_reversals: bool,
}

impl NewAddon {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self { name: name.into(), ..Default::default() }
    }

    pub fn with_support_email<S: Into<String>>(mut self, email: S) -> Self {
        self.support_email = Some(email.into());
        self
    }

    pub fn with_thankyou<S: Into<String>>(mut self, note: S) -> Self {
        self.enable_thankyou = true;
        self.thankyou_note = Some(note.into());
        self
    }

    pub fn with_reversal_notifications(mut self) -> Self {
        self.notify_reversals = true;
        self
    }
}
