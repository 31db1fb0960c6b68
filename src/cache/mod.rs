//! Cache Module
//!
//! Key-value stores that hold cached pages and access counters.

mod entry;
mod memory;
mod redis_store;
mod stats;


use std::time::Duration;

use async_trait::async_trait;

use crate::error::StoreResult;

// Re-export public types
pub use entry::StoredValue;
pub use memory::MemoryStore;
pub use redis_store::RedisStore;
pub use stats::StoreStats;

// == Key-Value Store ==
/// Operations the page cache needs from its backing store.
///
/// Each operation must be atomic on its own; nothing here spans more than
/// one call. Implementations report connection failures as
/// [`StoreError::Unavailable`](crate::error::StoreError::Unavailable).
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Adds one to the integer at `key`, creating it at 0 first if absent.
    /// Returns the new value.
    async fn increment(&self, key: &str) -> StoreResult<u64>;

    /// Returns the value at `key`, or None if absent or expired.
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Writes `value` at `key`, to expire after `ttl`.
    async fn set_with_expiry(&self, key: &str, value: &[u8], ttl: Duration) -> StoreResult<()>;

    /// Current lookup statistics.
    async fn stats(&self) -> StoreResult<StoreStats>;
}
