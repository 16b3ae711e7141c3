//! Replay protection cache

use parking_lot::Mutex;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Payload already accepted (replay), valid until {expires_at}")]
pub struct ReplayError {
    /// Expiry recorded for the earlier acceptance
    pub expires_at: i64,
}

/// Thread-safe replay cache keyed by decoded payload
///
/// Entries carry the payload's own expiry (seconds since epoch) and are swept
/// once `expires_at < now`. Sweep, lookup and insert share one lock, so two
/// callers racing with the same payload cannot both succeed.
#[derive(Default)]
pub struct ReplayCache {
    /// Map of payload -> expiration time
    seen: Mutex<HashMap<Vec<u8>, i64>>,
}

impl ReplayCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `key` as seen until `expires_at`.
    ///
    /// Fails without touching the entry if `key` is already live.
    pub fn check_and_insert(
        &self,
        key: &[u8],
        expires_at: i64,
        now: i64,
    ) -> Result<(), ReplayError> {
        let mut seen = self.seen.lock();

        seen.retain(|_, expiry| *expiry >= now);

        if let Some(existing) = seen.get(key) {
            return Err(ReplayError {
                expires_at: *existing,
            });
        }

        seen.insert(key.to_vec(), expires_at);
        Ok(())
    }

    /// Check if a payload is live (without inserting)
    pub fn contains(&self, key: &[u8], now: i64) -> bool {
        self.seen
            .lock()
            .get(key)
            .is_some_and(|expiry| *expiry >= now)
    }

    /// Remove expired entries, returning how many were dropped
    pub fn cleanup(&self, now: i64) -> usize {
        let mut seen = self.seen.lock();
        let before = seen.len();
        seen.retain(|_, expiry| *expiry >= now);
        before - seen.len()
    }

    /// Get the number of entries
    pub fn len(&self) -> usize {
        self.seen.lock().len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.seen.lock().is_empty()
    }
}
