//! Request DTOs for the page cache API
//!
//! Defines the structure of incoming query strings.

use serde::Deserialize;

/// Longest URL the service accepts
pub const MAX_URL_LENGTH: usize = 2048;

/// Query for the page and count endpoints (`?url=...`)
#[derive(Debug, Clone, Deserialize)]
pub struct PageQuery {
    /// Absolute http or https URL of the page
    pub url: String,
}

impl PageQuery {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.url.is_empty() {
            return Some("URL cannot be empty".to_string());
        }
        if self.url.len() > MAX_URL_LENGTH {
            return Some(format!(
                "URL exceeds maximum length of {} characters",
                MAX_URL_LENGTH
            ));
        }
        match reqwest::Url::parse(&self.url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => None,
            Ok(url) => Some(format!("Unsupported URL scheme: {}", url.scheme())),
            Err(e) => Some(format!("Invalid URL: {}", e)),
        }
    }
}
