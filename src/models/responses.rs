//! Response DTOs for the page cache API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::StoreStats;
use crate::page::{CachedPage, PageSource};

/// Response body for the page endpoint (GET /page)
#[derive(Debug, Clone, Serialize)]
pub struct PageResponse {
    /// The requested URL
    pub url: String,
    /// The page body
    pub body: String,
    /// Whether the body came from the cache, the network, or the network
    /// with the store unreachable
    pub source: PageSource,
    /// Number of requests for this URL so far, including this one
    pub access_count: Option<u64>,
}

impl PageResponse {
    pub fn new(url: impl Into<String>, page: CachedPage) -> Self {
        Self {
            url: url.into(),
            body: page.body,
            source: page.source,
            access_count: page.access_count,
        }
    }
}

/// Response body for the count endpoint (GET /count)
#[derive(Debug, Clone, Serialize)]
pub struct CountResponse {
    pub url: String,
    pub count: u64,
}

impl CountResponse {
    pub fn new(url: impl Into<String>, count: u64) -> Self {
        Self {
            url: url.into(),
            count,
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Number of store lookups that found a live value
    pub hits: u64,
    /// Number of store lookups that found nothing
    pub misses: u64,
    /// Number of entries dropped after their TTL elapsed
    pub expired: u64,
    /// Current number of keys in the store
    pub total_entries: usize,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl From<StoreStats> for StatsResponse {
    fn from(stats: StoreStats) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            hits: stats.hits,
            misses: stats.misses,
            expired: stats.expired,
            total_entries: stats.total_entries,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
