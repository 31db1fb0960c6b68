//! Cached Page Fetcher
//!
//! Wraps a [`PageFetcher`] so that every request for a URL is counted and
//! page bodies are served from a [`KeyValueStore`] for a short TTL.
//!
//! Counting, lookup, fetch and write are separate store operations. Two
//! concurrent misses for one URL may both reach the network and both write
//! the cache; the later write simply wins.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::cache::{KeyValueStore, StoreStats};
use crate::config::DEFAULT_PAGE_TTL_SECS;
use crate::error::{CacheError, Result, StoreError};
use crate::fetch::PageFetcher;

/// How long a fetched page stays cached unless configured otherwise.
pub const DEFAULT_PAGE_TTL: Duration = Duration::from_secs(DEFAULT_PAGE_TTL_SECS);

const PAGE_PREFIX: &str = "page:";
const COUNT_PREFIX: &str = "count:";

/// Store key holding the cached body for `url`.
pub fn page_key(url: &str) -> String {
    format!("{PAGE_PREFIX}{url}")
}

/// Store key holding the access counter for `url`.
pub fn count_key(url: &str) -> String {
    format!("{COUNT_PREFIX}{url}")
}

/// Where the body of a [`CachedPage`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSource {
    /// Served from the store without touching the network
    Cache,
    /// Fetched from the network and written to the store
    Origin,
    /// Fetched from the network while the store was unreachable
    Uncached,
}

/// Result of one call through [`CachedPageFetcher::fetch_page`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedPage {
    pub body: String,
    pub source: PageSource,
    /// Counter value after this call, None if counting failed
    pub access_count: Option<u64>,
}

/// Counting, caching front for a page fetcher.
#[derive(Clone)]
pub struct CachedPageFetcher {
    store: Arc<dyn KeyValueStore>,
    fetcher: Arc<dyn PageFetcher>,
    ttl: Duration,
}

impl CachedPageFetcher {
    pub fn new(store: Arc<dyn KeyValueStore>, fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            store,
            fetcher,
            ttl: DEFAULT_PAGE_TTL,
        }
    }

    /// Sets how long fetched pages stay cached.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the body of `url`, from the cache when a live copy exists.
    pub async fn fetch_cached(&self, url: &str) -> Result<String> {
        self.fetch_page(url).await.map(|page| page.body)
    }

    /// Like [`fetch_cached`](Self::fetch_cached), but gives up with
    /// [`CacheError::Cancelled`] once `cancel` fires. An access already
    /// counted stays counted.
    pub async fn fetch_cached_with_cancel(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<String> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(url, "Page request cancelled");
                Err(CacheError::Cancelled)
            }
            result = self.fetch_cached(url) => result,
        }
    }

    /// Counts the access, then serves `url` from the cache or the network.
    ///
    /// A store that cannot be reached degrades the call to a plain fetch;
    /// a failed cache write is logged and the fetched body still returned.
    /// Fetch failures are returned as errors and never cached.
    pub async fn fetch_page(&self, url: &str) -> Result<CachedPage> {
        let page_key = page_key(url);

        let access_count = match self.store.increment(&count_key(url)).await {
            Ok(count) => Some(count),
            Err(StoreError::Unavailable(reason)) => {
                warn!(url, %reason, "Store unavailable, fetching without cache");
                return self.fetch_uncached(url, None).await;
            }
            Err(err) => {
                warn!(url, error = %err, "Failed to count page access");
                None
            }
        };

        match self.store.get(&page_key).await {
            Ok(Some(bytes)) => match String::from_utf8(bytes) {
                Ok(body) => {
                    debug!(url, "Cache hit");
                    return Ok(CachedPage {
                        body,
                        source: PageSource::Cache,
                        access_count,
                    });
                }
                Err(_) => warn!(url, "Cached page is not valid UTF-8, refetching"),
            },
            Ok(None) => debug!(url, "Cache miss"),
            Err(StoreError::Unavailable(reason)) => {
                warn!(url, %reason, "Store unavailable, fetching without cache");
                return self.fetch_uncached(url, access_count).await;
            }
            Err(err) => warn!(url, error = %err, "Cache lookup failed, treating as miss"),
        }

        let body = self.fetcher.fetch(url).await?;

        if let Err(err) = self
            .store
            .set_with_expiry(&page_key, body.as_bytes(), self.ttl)
            .await
        {
            let err = CacheError::CacheWriteFailed(err.to_string());
            warn!(url, error = %err, "Fetched page was not cached");
        }

        Ok(CachedPage {
            body,
            source: PageSource::Origin,
            access_count,
        })
    }

    async fn fetch_uncached(&self, url: &str, access_count: Option<u64>) -> Result<CachedPage> {
        let body = self.fetcher.fetch(url).await?;
        Ok(CachedPage {
            body,
            source: PageSource::Uncached,
            access_count,
        })
    }

    /// Number of times `url` has been requested, 0 if never.
    pub async fn access_count(&self, url: &str) -> Result<u64> {
        let Some(bytes) = self.store.get(&count_key(url)).await? else {
            return Ok(0);
        };

        std::str::from_utf8(&bytes)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| CacheError::Store(format!("access counter for {url} is not an integer")))
    }

    pub async fn store_stats(&self) -> Result<StoreStats> {
        Ok(self.store.stats().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use crate::error::{FetchError, StoreResult};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Hands out scripted responses in order, repeating the last one.
    struct ScriptedFetcher {
        responses: Mutex<VecDeque<std::result::Result<String, FetchError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedFetcher {
        fn new(responses: Vec<std::result::Result<String, FetchError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                calls: AtomicUsize::new(0),
            })
        }

        fn bodies(bodies: &[&str]) -> Arc<Self> {
            Self::new(bodies.iter().map(|b| Ok(b.to_string())).collect())
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PageFetcher for ScriptedFetcher {
        async fn fetch(&self, _url: &str) -> std::result::Result<String, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut responses = self.responses.lock().unwrap();
            if responses.len() > 1 {
                responses.pop_front().unwrap()
            } else {
                responses.front().cloned().unwrap()
            }
        }
    }

    /// Never answers, so the caller has to give up first.
    struct HangingFetcher;

    #[async_trait]
    impl PageFetcher for HangingFetcher {
        async fn fetch(&self, _url: &str) -> std::result::Result<String, FetchError> {
            std::future::pending().await
        }
    }

    /// Store whose individual operations can be made to fail.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        increment_error: Option<StoreError>,
        get_error: Option<StoreError>,
        set_error: Option<StoreError>,
    }

    #[async_trait]
    impl KeyValueStore for FlakyStore {
        async fn increment(&self, key: &str) -> StoreResult<u64> {
            match &self.increment_error {
                Some(err) => Err(err.clone()),
                None => self.inner.increment(key).await,
            }
        }

        async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
            match &self.get_error {
                Some(err) => Err(err.clone()),
                None => self.inner.get(key).await,
            }
        }

        async fn set_with_expiry(&self, key: &str, value: &[u8], ttl: Duration) -> StoreResult<()> {
            match &self.set_error {
                Some(err) => Err(err.clone()),
                None => self.inner.set_with_expiry(key, value, ttl).await,
            }
        }

        async fn stats(&self) -> StoreResult<StoreStats> {
            self.inner.stats().await
        }
    }

    fn unavailable() -> StoreError {
        StoreError::Unavailable("connection refused".to_string())
    }

    fn pages(store: Arc<dyn KeyValueStore>, fetcher: Arc<ScriptedFetcher>) -> CachedPageFetcher {
        CachedPageFetcher::new(store, fetcher).with_ttl(Duration::from_secs(10))
    }

    #[test]
    fn test_keys_are_namespaced() {
        assert_eq!(page_key("http://x"), "page:http://x");
        assert_eq!(count_key("http://x"), "count:http://x");
        assert_ne!(page_key("http://x"), count_key("http://x"));
    }

    #[test]
    fn test_default_ttl() {
        let pages = CachedPageFetcher::new(
            Arc::new(MemoryStore::new()),
            ScriptedFetcher::bodies(&["x"]),
        );
        assert_eq!(pages.ttl(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hit_then_expiry_scenario() {
        let fetcher = ScriptedFetcher::bodies(&["PAGE-1", "PAGE-2"]);
        let pages = pages(Arc::new(MemoryStore::new()), fetcher.clone());

        let first = pages.fetch_page("http://x").await.unwrap();
        assert_eq!(first.body, "PAGE-1");
        assert_eq!(first.source, PageSource::Origin);
        assert_eq!(first.access_count, Some(1));
        assert_eq!(fetcher.calls(), 1);

        let second = pages.fetch_page("http://x").await.unwrap();
        assert_eq!(second.body, "PAGE-1");
        assert_eq!(second.source, PageSource::Cache);
        assert_eq!(second.access_count, Some(2));
        assert_eq!(fetcher.calls(), 1);

        tokio::time::advance(Duration::from_secs(11)).await;

        let third = pages.fetch_page("http://x").await.unwrap();
        assert_eq!(third.body, "PAGE-2");
        assert_eq!(third.source, PageSource::Origin);
        assert_eq!(third.access_count, Some(3));
        assert_eq!(fetcher.calls(), 2);

        assert_eq!(pages.access_count("http://x").await.unwrap(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_ttl_is_applied() {
        let fetcher = ScriptedFetcher::bodies(&["a", "b"]);
        let pages = CachedPageFetcher::new(Arc::new(MemoryStore::new()), fetcher.clone())
            .with_ttl(Duration::from_secs(2));

        pages.fetch_cached("http://x").await.unwrap();
        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(pages.fetch_cached("http://x").await.unwrap(), "a");

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(pages.fetch_cached("http://x").await.unwrap(), "b");
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_urls_are_isolated() {
        let fetcher = ScriptedFetcher::bodies(&["A", "B"]);
        let pages = pages(Arc::new(MemoryStore::new()), fetcher.clone());

        assert_eq!(pages.fetch_cached("http://a").await.unwrap(), "A");
        assert_eq!(pages.access_count("http://b").await.unwrap(), 0);

        assert_eq!(pages.fetch_cached("http://b").await.unwrap(), "B");
        assert_eq!(pages.fetch_cached("http://a").await.unwrap(), "A");

        assert_eq!(pages.access_count("http://a").await.unwrap(), 2);
        assert_eq!(pages.access_count("http://b").await.unwrap(), 1);
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_not_cached() {
        let store = Arc::new(MemoryStore::new());
        let fetcher = ScriptedFetcher::new(vec![
            Err(FetchError::Status {
                url: "http://x".to_string(),
                status: 500,
            }),
            Ok("recovered".to_string()),
        ]);
        let pages = pages(store.clone(), fetcher.clone());

        let result = pages.fetch_cached("http://x").await;
        assert!(matches!(
            result,
            Err(CacheError::FetchFailed(FetchError::Status { status: 500, .. }))
        ));
        assert_eq!(store.get(&page_key("http://x")).await.unwrap(), None);

        assert_eq!(pages.fetch_cached("http://x").await.unwrap(), "recovered");
        assert_eq!(fetcher.calls(), 2);
        assert_eq!(pages.access_count("http://x").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_empty_body_is_a_cache_hit() {
        let fetcher = ScriptedFetcher::bodies(&["", "not empty"]);
        let pages = pages(Arc::new(MemoryStore::new()), fetcher.clone());

        assert_eq!(pages.fetch_cached("http://x").await.unwrap(), "");

        let again = pages.fetch_page("http://x").await.unwrap();
        assert_eq!(again.body, "");
        assert_eq!(again.source, PageSource::Cache);
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_store_unavailable_falls_back_to_fetch() {
        let store = FlakyStore {
            increment_error: Some(unavailable()),
            get_error: Some(unavailable()),
            set_error: Some(unavailable()),
            ..Default::default()
        };
        let fetcher = ScriptedFetcher::bodies(&["live"]);
        let pages = pages(Arc::new(store), fetcher.clone());

        for _ in 0..2 {
            let page = pages.fetch_page("http://x").await.unwrap();
            assert_eq!(page.body, "live");
            assert_eq!(page.source, PageSource::Uncached);
            assert_eq!(page.access_count, None);
        }
        assert_eq!(fetcher.calls(), 2);

        let result = pages.access_count("http://x").await;
        assert!(matches!(result, Err(CacheError::StoreUnavailable(_))));
    }

    #[tokio::test]
    async fn test_lookup_unavailable_keeps_count() {
        let store = Arc::new(FlakyStore {
            get_error: Some(unavailable()),
            ..Default::default()
        });
        let fetcher = ScriptedFetcher::bodies(&["live"]);
        let pages = pages(store.clone(), fetcher.clone());

        let page = pages.fetch_page("http://x").await.unwrap();
        assert_eq!(page.source, PageSource::Uncached);
        assert_eq!(page.access_count, Some(1));
        assert_eq!(store.inner.len().await, 1, "Only the counter is written");
    }

    #[tokio::test]
    async fn test_counter_failure_does_not_block_page() {
        let store = FlakyStore {
            increment_error: Some(StoreError::Backend("WRONGTYPE".to_string())),
            ..Default::default()
        };
        let fetcher = ScriptedFetcher::bodies(&["body"]);
        let pages = pages(Arc::new(store), fetcher.clone());

        let first = pages.fetch_page("http://x").await.unwrap();
        assert_eq!(first.source, PageSource::Origin);
        assert_eq!(first.access_count, None);

        let second = pages.fetch_page("http://x").await.unwrap();
        assert_eq!(second.source, PageSource::Cache);
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_cache_write_failure_still_returns_body() {
        let store = FlakyStore {
            set_error: Some(StoreError::Backend("OOM".to_string())),
            ..Default::default()
        };
        let fetcher = ScriptedFetcher::bodies(&["fresh"]);
        let pages = pages(Arc::new(store), fetcher.clone());

        assert_eq!(pages.fetch_cached("http://x").await.unwrap(), "fresh");
        assert_eq!(pages.fetch_cached("http://x").await.unwrap(), "fresh");
        assert_eq!(fetcher.calls(), 2);
        assert_eq!(pages.access_count("http://x").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_invalid_utf8_entry_is_refetched() {
        let store = Arc::new(MemoryStore::new());
        store
            .set_with_expiry(&page_key("http://x"), &[0xff, 0xfe], Duration::from_secs(10))
            .await
            .unwrap();
        let fetcher = ScriptedFetcher::bodies(&["clean"]);
        let pages = pages(store.clone(), fetcher.clone());

        assert_eq!(pages.fetch_cached("http://x").await.unwrap(), "clean");
        assert_eq!(
            store.get(&page_key("http://x")).await.unwrap(),
            Some(b"clean".to_vec())
        );
    }

    #[tokio::test]
    async fn test_cancel_stops_waiting_and_keeps_count() {
        let store = Arc::new(MemoryStore::new());
        let pages = CachedPageFetcher::new(store, Arc::new(HangingFetcher));
        let cancel = CancellationToken::new();

        let canceller = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                cancel.cancel();
            })
        };

        let result = pages.fetch_cached_with_cancel("http://x", &cancel).await;
        assert!(matches!(result, Err(CacheError::Cancelled)));
        canceller.await.unwrap();

        assert_eq!(pages.access_count("http://x").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_requests_are_all_counted() {
        let fetcher = ScriptedFetcher::bodies(&["shared"]);
        let pages = pages(Arc::new(MemoryStore::new()), fetcher.clone());

        let handles: Vec<_> = (0..20)
            .map(|_| {
                let pages = pages.clone();
                tokio::spawn(async move { pages.fetch_cached("http://x").await })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "shared");
        }

        assert_eq!(pages.access_count("http://x").await.unwrap(), 20);
        assert!(fetcher.calls() >= 1);
    }
}
