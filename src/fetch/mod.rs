//! Fetch Module
//!
//! The network side of the page cache: anything that can turn a URL into a
//! page body.

mod http;

use async_trait::async_trait;

use crate::error::FetchError;

pub use http::HttpFetcher;

/// Retrieves the body of the page at a URL.
///
/// Failures must be reported as errors, never as an empty body.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}
