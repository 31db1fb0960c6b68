//! API Handlers
//!
//! HTTP request handlers for each page cache endpoint.

use axum::{
    extract::{Query, State},
    Json,
};

use crate::error::{CacheError, Result};
use crate::models::{CountResponse, HealthResponse, PageQuery, PageResponse, StatsResponse};
use crate::page::CachedPageFetcher;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Counting, caching page fetcher
    pub pages: CachedPageFetcher,
}

impl AppState {
    pub fn new(pages: CachedPageFetcher) -> Self {
        Self { pages }
    }
}

fn validated(query: PageQuery) -> Result<String> {
    match query.validate() {
        Some(error_msg) => Err(CacheError::InvalidRequest(error_msg)),
        None => Ok(query.url),
    }
}

/// Handler for GET /page?url=...
///
/// Returns the page body, fetched or cached, and counts the request.
pub async fn page_handler(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PageResponse>> {
    let url = validated(query)?;
    let page = state.pages.fetch_page(&url).await?;

    Ok(Json(PageResponse::new(url, page)))
}

/// Handler for GET /count?url=...
///
/// Returns how many times the page has been requested. Does not count itself.
pub async fn count_handler(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<CountResponse>> {
    let url = validated(query)?;
    let count = state.pages.access_count(&url).await?;

    Ok(Json(CountResponse::new(url, count)))
}

/// Handler for GET /stats
///
/// Returns backing store statistics.
pub async fn stats_handler(State(state): State<AppState>) -> Result<Json<StatsResponse>> {
    let stats = state.pages.store_stats().await?;

    Ok(Json(stats.into()))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
