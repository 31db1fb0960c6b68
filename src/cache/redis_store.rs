//! Redis Store Module
//!
//! Key-value store backed by a Redis server.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::RedisError;

use crate::cache::{KeyValueStore, StoreStats};
use crate::error::{StoreError, StoreResult};

#[derive(Debug, Clone)]
pub struct RedisStore {
    pub client: redis::Client,
}

impl RedisStore {
    /// Creates a store for `redis_url`. No connection is made until first use.
    pub fn new(redis_url: &str) -> StoreResult<Self> {
        let client = redis::Client::open(redis_url).map_err(classify)?;
        Ok(Self { client })
    }

    async fn connection(&self) -> StoreResult<MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(classify)
    }
}

/// Maps redis failures onto the store taxonomy: anything that means the
/// server could not be talked to is `Unavailable`.
fn classify(err: RedisError) -> StoreError {
    if err.is_io_error()
        || err.is_connection_refusal()
        || err.is_connection_dropped()
        || err.is_timeout()
    {
        StoreError::Unavailable(err.to_string())
    } else {
        StoreError::Backend(err.to_string())
    }
}

/// Pulls the counters this crate reports out of an `INFO stats` reply.
fn parse_info_stats(info: &str) -> StoreStats {
    let mut stats = StoreStats::new();
    for line in info.lines() {
        let Some((name, value)) = line.trim().split_once(':') else {
            continue;
        };
        let Ok(value) = value.parse::<u64>() else {
            continue;
        };
        match name {
            "keyspace_hits" => stats.hits = value,
            "keyspace_misses" => stats.misses = value,
            "expired_keys" => stats.expired = value,
            _ => {}
        }
    }
    stats
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn increment(&self, key: &str) -> StoreResult<u64> {
        let mut conn = self.connection().await?;
        let count: u64 = redis::cmd("INCR")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(classify)?;

        Ok(count)
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let mut conn = self.connection().await?;
        let data: Option<Vec<u8>> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(classify)?;

        Ok(data)
    }

    async fn set_with_expiry(&self, key: &str, value: &[u8], ttl: Duration) -> StoreResult<()> {
        let mut conn = self.connection().await?;
        // PX 0 is rejected by the server
        let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);

        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("PX")
            .arg(millis)
            .query_async(&mut conn)
            .await
            .map_err(classify)?;

        Ok(())
    }

    async fn stats(&self) -> StoreResult<StoreStats> {
        let mut conn = self.connection().await?;
        let info: String = redis::cmd("INFO")
            .arg("stats")
            .query_async(&mut conn)
            .await
            .map_err(classify)?;
        let total_entries: usize = redis::cmd("DBSIZE")
            .query_async(&mut conn)
            .await
            .map_err(classify)?;

        let mut stats = parse_info_stats(&info);
        stats.set_total_entries(total_entries);
        Ok(stats)
    }
}
