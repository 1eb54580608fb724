use std::collections::BTreeMap;

use log::*;
use serde::{Deserialize, Serialize};

use super::RawNotification;

pub type TransactionFields = BTreeMap<String, String>;

const TRANSACTION_PREFIX: &str = "transaction[";

/// A notification split into top-level fields and per-transaction fields.
///
/// Transactions are kept in ascending index order. Missing fields are not an error at this stage; the reconciliation
/// step decides what it needs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedNotification {
    pub fields: BTreeMap<String, String>,
    pub transactions: BTreeMap<u32, TransactionFields>,
}

impl ParsedNotification {
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn tracking_id(&self) -> Option<&str> {
        self.field("tracking_id")
    }

    pub fn txn_type(&self) -> Option<&str> {
        self.field("txn_type")
    }

    pub fn transaction(&self, index: u32) -> Option<&TransactionFields> {
        self.transactions.get(&index)
    }

    pub fn transaction_field(&self, index: u32, key: &str) -> Option<&str> {
        self.transaction(index).and_then(|t| t.get(key)).map(String::as_str)
    }

    pub fn is_subscription_event(&self) -> bool {
        self.txn_type().map(|t| t.starts_with("subscr_")).unwrap_or(false)
    }

    /// JSON copy of the notification, as stored alongside ledger records.
    pub fn to_post_data(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl From<&RawNotification> for ParsedNotification {
    fn from(raw: &RawNotification) -> Self {
        let mut result = ParsedNotification::default();
        for (key, value) in raw.pairs() {
            if !key.starts_with(TRANSACTION_PREFIX) {
                result.fields.insert(key.clone(), value.clone());
                continue;
            }
            match split_transaction_key(key) {
                Some((index, field)) => {
                    result.transactions.entry(index).or_default().insert(field.to_string(), value.clone());
                },
                None => warn!("📬️ Ignoring malformed transaction key '{key}' in notification"),
            }
        }
        result
    }
}

/// Splits `transaction[<index>].<field>` into its index and field. The index must be a plain decimal integer and the
/// field must not be empty.
fn split_transaction_key(key: &str) -> Option<(u32, &str)> {
    let rest = key.strip_prefix(TRANSACTION_PREFIX)?;
    let (index, rest) = rest.split_once(']')?;
    let field = rest.strip_prefix('.')?;
    if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) || field.is_empty() {
        return None;
    }
    let index = index.parse::<u32>().ok()?;
    Some((index, field))
}
