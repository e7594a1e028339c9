//! HTTP API layer for Re-Source.
//!
//! - **Endpoints**: JSON REST API for listings, wishlists, chat and moderation
//! - **Extractors**: bearer-token authentication
//! - **SSE**: live conversation streams
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;
pub mod sse;

pub use endpoints::{authenticated_router, router};
pub use sse::{SseBroadcaster, SseEvent};
