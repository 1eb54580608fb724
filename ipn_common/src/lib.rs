pub mod helpers;
mod money;

pub use money::{Money, MoneyParseError};
