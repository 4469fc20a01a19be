//! Single-slot context cache.
//!
//! Holds exactly one rendered context keyed by the normalized query, so the
//! common "user asks a follow-up about the same thing" path skips the source
//! round-trips. One slot is deliberate: contexts are large and the site's
//! traffic is bursts of one conversation at a time.

use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// Normalize a query into a cache key: lowercase, whitespace collapsed.
pub fn cache_key(query: &str) -> String {
    query.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

struct Slot<V> {
    key: String,
    value: V,
    stored_at: Instant,
}

/// One-entry cache with a TTL. Writes always replace whatever is stored.
pub struct SingleSlotCache<V> {
    ttl: Duration,
    slot: Mutex<Option<Slot<V>>>,
}

impl<V: Clone> SingleSlotCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: Mutex::new(None),
        }
    }

    /// The cached value, if the key matches exactly and the entry is fresh.
    pub fn get(&self, key: &str) -> Option<V> {
        let slot = self.slot.lock();
        match slot.as_ref() {
            Some(entry) if entry.key == key && entry.stored_at.elapsed() < self.ttl => {
                Some(entry.value.clone())
            }
            _ => None,
        }
    }

    /// Store a value, displacing any previous entry. Last write wins.
    pub fn put(&self, key: impl Into<String>, value: V) {
        let mut slot = self.slot.lock();
        *slot = Some(Slot {
            key: key.into(),
            value,
            stored_at: Instant::now(),
        });
    }

    /// Whether a fresh entry is stored, regardless of key.
    pub fn is_warm(&self) -> bool {
        let slot = self.slot.lock();
        slot.as_ref()
            .is_some_and(|entry| entry.stored_at.elapsed() < self.ttl)
    }

    pub fn clear(&self) {
        *self.slot.lock() = None;
    }
}
