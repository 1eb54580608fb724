//! Miss counters for notifications whose ledger record cannot be found yet.
//!
//! The processor redelivers a notification until it gets a success response. When a notification refers to a record
//! that does not exist (yet), the engine counts the miss under the notification's tracking id and answers with a
//! transient failure. Once the count passes a threshold the notification is accepted and dropped, so that an orphaned
//! notification is not redelivered forever.
//!
//! Counters are shared, process-wide state. Increments must be atomic and counters expire after a fixed window that
//! starts at the first miss.
mod memory;

use chrono::{DateTime, Duration, Utc};
pub use memory::MemoryMissCounter;

pub const DEFAULT_MISS_WINDOW_DAYS: i64 = 14;
/// The longest miss window, in days, that configuration will accept.
pub const MAX_MISS_WINDOW_DAYS: i64 = 3650;
pub const DEFAULT_MISS_THRESHOLD: u64 = 10;

pub fn default_miss_window() -> Duration {
    Duration::days(DEFAULT_MISS_WINDOW_DAYS)
}

/// The expiry of a counter created at `now`. A window that runs past the last representable instant saturates there.
pub fn window_expiry(now: DateTime<Utc>, window: Duration) -> DateTime<Utc> {
    now.checked_add_signed(window).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// The namespaced counter key for a tracking id, `<prefix>contrib:<tracking_id>`.
pub fn miss_key(prefix: &str, tracking_id: &str) -> String {
    format!("{prefix}contrib:{tracking_id}")
}

/// A store of expiring miss counters.
#[allow(async_fn_in_trait)]
pub trait MissCounter: Clone {
    type Error: std::error::Error;

    /// Records a miss for `key` and returns the new count.
    ///
    /// The first miss creates the counter with a count of 1 and starts the expiry window. Later misses increment the
    /// count and leave the expiry untouched.
    async fn note_miss(&self, key: &str) -> Result<u64, Self::Error>;

    /// The current count for `key`, or zero if there is no live counter.
    async fn peek(&self, key: &str) -> Result<u64, Self::Error>;

    /// Removes the counter for `key`. Clearing a missing counter is not an error.
    async fn clear(&self, key: &str) -> Result<(), Self::Error>;
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn keys_are_namespaced() {
        assert_eq!(miss_key("ipn:", "5678"), "ipn:contrib:5678");
        assert_eq!(miss_key("", "5678"), "contrib:5678");
    }

    #[test]
    fn oversized_windows_saturate() {
        let now = Utc::now();
        assert_eq!(window_expiry(now, Duration::max_value()), DateTime::<Utc>::MAX_UTC);
        assert_eq!(window_expiry(now, Duration::days(1)), now + Duration::days(1));
        assert!(window_expiry(now, Duration::days(-1)) < now);
    }
}
