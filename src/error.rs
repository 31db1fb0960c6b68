//! Error types for the page cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Fetch Error ==
/// Failure reported by a page fetcher.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Upstream answered with a non-success status
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// Upstream did not answer within the fetch timeout
    #[error("timed out fetching {url}")]
    Timeout { url: String },

    /// The URL could not be turned into a request
    #[error("invalid url {url}: {message}")]
    InvalidUrl { url: String, message: String },

    /// Connection, TLS or body read failure
    #[error("transport error fetching {url}: {message}")]
    Transport { url: String, message: String },
}

// == Store Error ==
/// Failure reported by a key-value store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store cannot be reached
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store was reached but rejected the operation
    #[error("store error: {0}")]
    Backend(String),
}

/// Result type for key-value store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

// == Cache Error Enum ==
/// Unified error type for the page cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The page could not be fetched
    #[error("Fetch failed: {0}")]
    FetchFailed(#[from] FetchError),

    /// The backing store cannot be reached
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// The backing store rejected an operation
    #[error("Store error: {0}")]
    Store(String),

    /// A fetched page could not be written to the store
    #[error("Cache write failed: {0}")]
    CacheWriteFailed(String),

    /// The caller cancelled the request
    #[error("Request cancelled")]
    Cancelled,

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for CacheError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => CacheError::StoreUnavailable(msg),
            StoreError::Backend(msg) => CacheError::Store(msg),
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::FetchFailed(FetchError::Timeout { .. }) => StatusCode::GATEWAY_TIMEOUT,
            CacheError::FetchFailed(_) => StatusCode::BAD_GATEWAY,
            CacheError::StoreUnavailable(_) | CacheError::Cancelled => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            CacheError::Store(_) | CacheError::CacheWriteFailed(_) | CacheError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the page cache.
pub type Result<T> = std::result::Result<T, CacheError>;
