//! Configuration Module
//!
//! Handles loading and managing service configuration from environment variables.

use std::env;
use std::time::Duration;

/// Default page TTL in seconds
pub const DEFAULT_PAGE_TTL_SECS: u64 = 10;

/// Default upstream fetch timeout in seconds
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Service configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// How long a fetched page stays cached, in seconds
    pub page_ttl: u64,
    /// Upper bound on a single upstream fetch, in seconds
    pub fetch_timeout: u64,
    /// HTTP server port
    pub server_port: u16,
    /// Background cleanup task interval in seconds (memory store only)
    pub cleanup_interval: u64,
    /// Redis connection URL; the in-process store is used when unset
    pub redis_url: Option<String>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `PAGE_TTL` - Page TTL in seconds (default: 10)
    /// - `FETCH_TIMEOUT` - Upstream fetch timeout in seconds (default: 30)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CLEANUP_INTERVAL` - Cleanup frequency in seconds (default: 1)
    /// - `REDIS_URL` - Redis URL, e.g. `redis://127.0.0.1:6379/0` (default: unset)
    pub fn from_env() -> Self {
        Self {
            page_ttl: positive_var("PAGE_TTL").unwrap_or(DEFAULT_PAGE_TTL_SECS),
            fetch_timeout: positive_var("FETCH_TIMEOUT").unwrap_or(DEFAULT_FETCH_TIMEOUT_SECS),
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            cleanup_interval: positive_var("CLEANUP_INTERVAL").unwrap_or(1),
            redis_url: env::var("REDIS_URL").ok().filter(|v| !v.trim().is_empty()),
        }
    }

    /// Page TTL as a Duration.
    pub fn page_ttl(&self) -> Duration {
        Duration::from_secs(self.page_ttl)
    }

    /// Fetch timeout as a Duration.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout)
    }
}

/// Reads a strictly positive integer variable; zero and garbage count as unset.
fn positive_var(name: &str) -> Option<u64> {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .filter(|v| *v > 0)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            page_ttl: DEFAULT_PAGE_TTL_SECS,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT_SECS,
            server_port: 3000,
            cleanup_interval: 1,
            redis_url: None,
        }
    }
}
