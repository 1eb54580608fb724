use std::{collections::HashMap, convert::Infallible, fmt::Debug, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use log::*;
use tokio::sync::Mutex;

use super::{default_miss_window, window_expiry, MissCounter};

#[derive(Debug, Clone, Copy)]
struct MissEntry {
    count: u64,
    expires_at: DateTime<Utc>,
}

impl MissEntry {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// In-process miss counters. Clones share the same store.
///
/// Counters are lost on restart, which only means a few extra redeliveries before an orphaned notification is
/// skipped.
#[derive(Clone)]
pub struct MemoryMissCounter {
    window: Duration,
    entries: Arc<Mutex<HashMap<String, MissEntry>>>,
}

impl Debug for MemoryMissCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MemoryMissCounter (window: {})", self.window)
    }
}

impl Default for MemoryMissCounter {
    fn default() -> Self {
        Self::new(default_miss_window())
    }
}

impl MemoryMissCounter {
    pub fn new(window: Duration) -> Self {
        Self { window, entries: Arc::new(Mutex::new(HashMap::new())) }
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

impl MissCounter for MemoryMissCounter {
    type Error = Infallible;

    async fn note_miss(&self, key: &str) -> Result<u64, Self::Error> {
        let now = Utc::now();
        let mut entries = self.entries.lock().await;
        // Expired entries are purged lazily, on the next miss
        entries.retain(|_, e| e.is_live(now));
        let expires_at = window_expiry(now, self.window);
        let entry = entries.entry(key.to_string()).or_insert(MissEntry { count: 0, expires_at });
        entry.count += 1;
        trace!("🧮️ Miss #{} recorded for {key}", entry.count);
        Ok(entry.count)
    }

    async fn peek(&self, key: &str) -> Result<u64, Self::Error> {
        let now = Utc::now();
        let entries = self.entries.lock().await;
        Ok(entries.get(key).filter(|e| e.is_live(now)).map(|e| e.count).unwrap_or(0))
    }

    async fn clear(&self, key: &str) -> Result<(), Self::Error> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}
