//! Memory Store Module
//!
//! In-process key-value store with self-expiring values and atomic counters.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::cache::{KeyValueStore, StoreStats, StoredValue};
use crate::error::{StoreError, StoreResult};

#[derive(Debug, Default)]
struct Inner {
    /// Key-value storage
    entries: HashMap<String, StoredValue>,
    /// Lookup statistics
    stats: StoreStats,
}

impl Inner {
    /// Returns the live value for `key`, dropping it first if it has expired.
    fn live(&mut self, key: &str) -> Option<&mut StoredValue> {
        if self.entries.get(key).is_some_and(StoredValue::is_expired) {
            self.entries.remove(key);
            self.stats.record_expired(1);
        }
        self.entries.get_mut(key)
    }
}

// == Memory Store ==
/// Key-value store held in process memory.
///
/// Every operation takes the single write lock, so `increment` and
/// `set_with_expiry` are atomic with respect to each other.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // == Cleanup Expired ==
    /// Removes all expired entries from the store.
    ///
    /// Returns the number of entries removed.
    pub async fn purge_expired(&self) -> usize {
        let mut inner = self.inner.write().await;
        let before = inner.entries.len();
        inner.entries.retain(|_, value| !value.is_expired());
        let removed = before - inner.entries.len();
        inner.stats.record_expired(removed);
        removed
    }

    /// Returns the number of entries currently held, expired or not.
    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.entries.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn increment(&self, key: &str) -> StoreResult<u64> {
        let mut inner = self.inner.write().await;

        let Some(value) = inner.live(key) else {
            inner
                .entries
                .insert(key.to_string(), StoredValue::persistent(b"1".to_vec()));
            return Ok(1);
        };

        let current: u64 = std::str::from_utf8(&value.data)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| {
                StoreError::Backend("value is not an integer or out of range".to_string())
            })?;
        let next = current
            .checked_add(1)
            .ok_or_else(|| StoreError::Backend("increment would overflow".to_string()))?;

        // Keeps whatever expiry the counter already had
        value.data = next.to_string().into_bytes();
        Ok(next)
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        // Write lock: expired values are dropped and stats updated on read
        let mut inner = self.inner.write().await;

        let data = inner.live(key).map(|value| value.data.clone());
        match data {
            Some(_) => inner.stats.record_hit(),
            None => inner.stats.record_miss(),
        }
        Ok(data)
    }

    async fn set_with_expiry(&self, key: &str, value: &[u8], ttl: Duration) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        inner
            .entries
            .insert(key.to_string(), StoredValue::expiring(value.to_vec(), ttl));
        Ok(())
    }

    async fn stats(&self) -> StoreResult<StoreStats> {
        let inner = self.inner.read().await;
        let mut stats = inner.stats.clone();
        stats.set_total_entries(inner.entries.len());
        Ok(stats)
    }
}
