use std::{fmt::Display, ops::Neg, str::FromStr};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

//--------------------------------------        Money          ---------------------------------------------------------
/// An exact monetary amount in a given currency.
///
/// The amount keeps the scale it was parsed with, so `USD 0.010` stays `0.010` and is never routed through a float.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    amount: Decimal,
    currency: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyParseError {
    #[error("Amount string '{0}' is not of the form '<CURRENCY> <DECIMAL>'")]
    InvalidFormat(String),
    #[error("Amount string '{0}' has no currency code")]
    MissingCurrency(String),
    #[error("'{value}' is not a valid decimal amount. {reason}")]
    InvalidDecimal { value: String, reason: String },
}

impl Money {
    pub fn new<S: Into<String>>(amount: Decimal, currency: S) -> Self {
        Self { amount, currency: currency.into() }
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> &str {
        self.currency.as_str()
    }

    pub fn is_negative(&self) -> bool {
        self.amount.is_sign_negative() && !self.amount.is_zero()
    }
}

impl Default for Money {
    fn default() -> Self {
        Self { amount: Decimal::ZERO, currency: "USD".to_string() }
    }
}

/// Parses the processor's `"<CURRENCY> <DECIMAL>"` amount notation, e.g. `USD 0.01`.
impl FromStr for Money {
    type Err = MoneyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let (currency, value) = match (parts.next(), parts.next(), parts.next()) {
            (Some(c), Some(v), None) => (c, v),
            (Some(_), None, None) | (None, _, _) => return Err(MoneyParseError::MissingCurrency(s.to_string())),
            _ => return Err(MoneyParseError::InvalidFormat(s.to_string())),
        };
        if currency.is_empty() {
            return Err(MoneyParseError::MissingCurrency(s.to_string()));
        }
        let amount = Decimal::from_str(value)
            .map_err(|e| MoneyParseError::InvalidDecimal { value: value.to_string(), reason: e.to_string() })?;
        Ok(Self { amount, currency: currency.to_string() })
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self { amount: -self.amount, currency: self.currency }
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}
