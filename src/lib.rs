//! Page Cache - an HTTP page fetcher with TTL caching and access counting
//!
//! Every request for a URL is counted; page bodies are kept in a key-value
//! store for a short TTL so repeat requests skip the network.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod models;
pub mod page;
pub mod tasks;

pub use api::AppState;
pub use config::Config;
pub use page::{CachedPage, CachedPageFetcher, PageSource};
pub use tasks::spawn_cleanup_task;
