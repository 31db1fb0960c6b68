//! API Module
//!
//! HTTP handlers and routing for the page cache service.
//!
//! # Endpoints
//! - `GET /page?url=...` - Fetch a page through the cache
//! - `GET /count?url=...` - Number of requests seen for a page
//! - `GET /stats` - Backing store statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
